//! In-memory store for tests.
//!
//! Mirrors the MySQL unique indexes on (category, subject_id, period) and
//! (payroll_id, entry_type). Every call yields to the runtime first so that
//! concurrent operations interleave the way they would against a database.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::yield_now;

use super::{
    ComponentStore, DeductionRuleStore, LedgerTransaction, PayrollLedger, StoreError,
    SubjectDirectory,
};
use crate::model::accounting_entry::{AccountingEntry, NewAccountingEntry};
use crate::model::deduction_rule::{DeductionRule, NewDeductionRule};
use crate::model::payroll::{NewPayroll, Payroll, PayrollFilter, PayrollStatus};
use crate::model::period::Period;
use crate::model::salary_component::{NewSalaryComponent, SalaryComponent};
use crate::model::subject::{Subject, SubjectCategory};

#[derive(Default)]
struct State {
    next_id: u64,
    subjects: Vec<Subject>,
    components: BTreeMap<u64, SalaryComponent>,
    rules: BTreeMap<u64, DeductionRule>,
    payrolls: BTreeMap<u64, Payroll>,
    entries: Vec<AccountingEntry>,
    /// 1-based ordinal of the entry insert that fails inside the next transaction.
    fail_entry_insert: Option<usize>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn payroll_taken(&self, category: SubjectCategory, subject_id: u64, period: &Period) -> bool {
        self.payrolls
            .values()
            .any(|p| p.category == category && p.subject_id == subject_id && p.period == *period)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }

    pub fn add_subject(&self, category: SubjectCategory, id: u64, name: &str) -> Subject {
        let subject = Subject {
            id,
            category,
            name: name.to_string(),
            email: Some(format!("{}@company.test", name.to_lowercase().replace(' ', "."))),
        };
        self.lock().subjects.push(subject.clone());
        subject
    }

    pub fn fail_entry_insert_at(&self, ordinal: usize) {
        self.lock().fail_entry_insert = Some(ordinal);
    }

    pub fn payroll_count(&self) -> usize {
        self.lock().payrolls.len()
    }

    pub fn entry_count(&self) -> usize {
        self.lock().entries.len()
    }
}

#[async_trait]
impl ComponentStore for MemoryStore {
    async fn create_component(&self, new: &NewSalaryComponent) -> Result<SalaryComponent, StoreError> {
        yield_now().await;
        let mut state = self.lock();
        let component = SalaryComponent::from_new(state.next_id(), new);
        state.components.insert(component.id, component.clone());
        Ok(component)
    }

    async fn find_component(&self, id: u64) -> Result<Option<SalaryComponent>, StoreError> {
        yield_now().await;
        Ok(self.lock().components.get(&id).cloned())
    }

    async fn update_component(&self, component: &SalaryComponent) -> Result<(), StoreError> {
        yield_now().await;
        self.lock().components.insert(component.id, component.clone());
        Ok(())
    }

    async fn delete_component(&self, id: u64) -> Result<bool, StoreError> {
        yield_now().await;
        Ok(self.lock().components.remove(&id).is_some())
    }

    async fn components_for(
        &self,
        category: SubjectCategory,
        subject_id: u64,
    ) -> Result<Vec<SalaryComponent>, StoreError> {
        yield_now().await;
        Ok(self
            .lock()
            .components
            .values()
            .filter(|c| c.category == category && c.subject_id == subject_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DeductionRuleStore for MemoryStore {
    async fn create_rule(&self, new: &NewDeductionRule) -> Result<DeductionRule, StoreError> {
        yield_now().await;
        let mut state = self.lock();
        let rule = DeductionRule::from_new(state.next_id(), new);
        state.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn find_rule(&self, id: u64) -> Result<Option<DeductionRule>, StoreError> {
        yield_now().await;
        Ok(self.lock().rules.get(&id).cloned())
    }

    async fn update_rule(&self, rule: &DeductionRule) -> Result<(), StoreError> {
        yield_now().await;
        self.lock().rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn delete_rule(&self, id: u64) -> Result<bool, StoreError> {
        yield_now().await;
        Ok(self.lock().rules.remove(&id).is_some())
    }

    async fn list_rules(&self) -> Result<Vec<DeductionRule>, StoreError> {
        yield_now().await;
        Ok(self.lock().rules.values().cloned().collect())
    }
}

#[async_trait]
impl SubjectDirectory for MemoryStore {
    async fn payable_subjects(&self, category: SubjectCategory) -> Result<Vec<Subject>, StoreError> {
        yield_now().await;
        let mut subjects: Vec<Subject> = self
            .lock()
            .subjects
            .iter()
            .filter(|s| s.category == category)
            .cloned()
            .collect();
        subjects.sort_by_key(|s| s.id);
        Ok(subjects)
    }

    async fn find_subject(
        &self,
        category: SubjectCategory,
        id: u64,
    ) -> Result<Option<Subject>, StoreError> {
        yield_now().await;
        Ok(self
            .lock()
            .subjects
            .iter()
            .find(|s| s.category == category && s.id == id)
            .cloned())
    }
}

#[async_trait]
impl PayrollLedger for MemoryStore {
    async fn period_processed(
        &self,
        period: &Period,
        category: SubjectCategory,
    ) -> Result<bool, StoreError> {
        yield_now().await;
        Ok(self
            .lock()
            .payrolls
            .values()
            .any(|p| p.period == *period && p.category == category))
    }

    async fn find_payroll(&self, id: u64) -> Result<Option<Payroll>, StoreError> {
        yield_now().await;
        Ok(self.lock().payrolls.get(&id).cloned())
    }

    async fn list_payrolls(&self, filter: &PayrollFilter) -> Result<(Vec<Payroll>, i64), StoreError> {
        yield_now().await;
        let mut matching: Vec<Payroll> = self
            .lock()
            .payrolls
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.period.cmp(&a.period).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_payroll_status(
        &self,
        id: u64,
        status: PayrollStatus,
    ) -> Result<Option<Payroll>, StoreError> {
        yield_now().await;
        let mut state = self.lock();
        Ok(state.payrolls.get_mut(&id).map(|p| {
            p.status = status;
            p.clone()
        }))
    }

    async fn set_payslip_link(&self, id: u64, link: &str) -> Result<bool, StoreError> {
        yield_now().await;
        let mut state = self.lock();
        Ok(state
            .payrolls
            .get_mut(&id)
            .map(|p| p.payslip_link = Some(link.to_string()))
            .is_some())
    }

    async fn entries_for(&self, payroll_id: u64) -> Result<Vec<AccountingEntry>, StoreError> {
        yield_now().await;
        Ok(self
            .lock()
            .entries
            .iter()
            .filter(|e| e.payroll_id == payroll_id)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        yield_now().await;
        let fail_entry_insert = self.lock().fail_entry_insert.take();
        Ok(Box::new(MemoryTx {
            state: self.state.clone(),
            payrolls: Vec::new(),
            entries: Vec::new(),
            exported: Vec::new(),
            entry_inserts: 0,
            fail_entry_insert,
        }))
    }
}

/// Staged writes, applied under one lock on commit.
struct MemoryTx {
    state: Arc<Mutex<State>>,
    payrolls: Vec<Payroll>,
    entries: Vec<AccountingEntry>,
    exported: Vec<(u64, DateTime<Utc>)>,
    entry_inserts: usize,
    fail_entry_insert: Option<usize>,
}

impl MemoryTx {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store poisoned")
    }
}

fn entry_taken(entries: &[AccountingEntry], payroll_id: u64, entry: &AccountingEntry) -> bool {
    entries
        .iter()
        .any(|e| e.payroll_id == payroll_id && e.entry_type == entry.entry_type)
}

#[async_trait]
impl LedgerTransaction for MemoryTx {
    async fn insert_payroll(&mut self, new: &NewPayroll) -> Result<Payroll, StoreError> {
        yield_now().await;
        let staged_clash = self.payrolls.iter().any(|p| {
            p.category == new.category && p.subject_id == new.subject_id && p.period == new.period
        });
        let mut state = self.lock();
        if staged_clash || state.payroll_taken(new.category, new.subject_id, &new.period) {
            return Err(StoreError::Duplicate(format!(
                "payroll {}/{}/{}",
                new.category, new.subject_id, new.period
            )));
        }
        let payroll = Payroll::from_new(state.next_id(), new.clone(), Utc::now());
        drop(state);
        self.payrolls.push(payroll.clone());
        Ok(payroll)
    }

    async fn payroll_for_update(&mut self, id: u64) -> Result<Option<Payroll>, StoreError> {
        yield_now().await;
        Ok(self.lock().payrolls.get(&id).cloned())
    }

    async fn insert_entry(
        &mut self,
        payroll_id: u64,
        entry: &NewAccountingEntry,
    ) -> Result<AccountingEntry, StoreError> {
        yield_now().await;
        self.entry_inserts += 1;
        if self.fail_entry_insert == Some(self.entry_inserts) {
            return Err(StoreError::Backend("injected entry insert failure".into()));
        }

        let mut state = self.lock();
        let created = AccountingEntry::from_new(state.next_id(), payroll_id, entry);
        if entry_taken(&state.entries, payroll_id, &created) {
            return Err(StoreError::Duplicate(format!(
                "entry {}/{}",
                payroll_id, created.entry_type
            )));
        }
        drop(state);
        self.entries.push(created.clone());
        Ok(created)
    }

    async fn mark_exported(&mut self, payroll_id: u64, at: DateTime<Utc>) -> Result<(), StoreError> {
        yield_now().await;
        let already = self
            .lock()
            .payrolls
            .get(&payroll_id)
            .is_some_and(|p| p.exported_at.is_some());
        if already {
            return Err(StoreError::Duplicate(format!("payroll {} exported", payroll_id)));
        }
        self.exported.push((payroll_id, at));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        yield_now().await;
        let mut state = self.lock();

        for payroll in &self.payrolls {
            if state.payroll_taken(payroll.category, payroll.subject_id, &payroll.period) {
                return Err(StoreError::Duplicate(format!("payroll {}", payroll.id)));
            }
        }
        for entry in &self.entries {
            if entry_taken(&state.entries, entry.payroll_id, entry) {
                return Err(StoreError::Duplicate(format!("entry {}", entry.id)));
            }
        }
        for (payroll_id, _) in &self.exported {
            if state.payrolls.get(payroll_id).is_some_and(|p| p.exported_at.is_some()) {
                return Err(StoreError::Duplicate(format!("payroll {} exported", payroll_id)));
            }
        }

        for payroll in &self.payrolls {
            state.payrolls.insert(payroll.id, payroll.clone());
        }
        state.entries.extend(self.entries.iter().cloned());
        for (payroll_id, at) in &self.exported {
            if let Some(p) = state.payrolls.get_mut(payroll_id) {
                p.exported_at = Some(*at);
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
