use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::figures;
use crate::error::PayrollError;
use crate::model::payroll::{NewPayroll, Payroll};
use crate::model::period::Period;
use crate::model::subject::SubjectCategory;
use crate::store::{PayrollRepository, StoreError, rollback_quietly};

/// Monthly batch run for one subject category.
///
/// A run is all-or-nothing: every record is inserted inside one transaction,
/// and a unique-index collision from a concurrent run for the same period
/// rolls the whole batch back and reports `AlreadyProcessed`.
pub struct PayrollRunner {
    store: Arc<dyn PayrollRepository>,
}

impl PayrollRunner {
    pub fn new(store: Arc<dyn PayrollRepository>) -> Self {
        Self { store }
    }

    #[instrument(name = "payroll_run", skip_all, fields(period = %period, category = %category))]
    pub async fn run(
        &self,
        period: &Period,
        category: SubjectCategory,
    ) -> Result<Vec<Payroll>, PayrollError> {
        info!("Payroll run requested");

        let already_processed = || PayrollError::AlreadyProcessed {
            period: period.clone(),
            category,
        };

        if self.store.period_processed(period, category).await? {
            warn!("Payroll run rejected: period already processed");
            return Err(already_processed());
        }

        let rules = self.store.list_rules().await?;
        let subjects = self.store.payable_subjects(category).await?;
        debug!(subjects = subjects.len(), rules = rules.len(), "Computing payroll figures");

        let mut drafts = Vec::with_capacity(subjects.len());
        for subject in &subjects {
            let components = self.store.components_for(category, subject.id).await?;
            let figures = figures::compute(category, &components, &rules);

            if !figures.is_payable() {
                debug!(subject_id = subject.id, "Skipping subject without positive gross");
                continue;
            }
            if figures.capped {
                warn!(
                    subject_id = subject.id,
                    gross = %figures.gross,
                    "Deductions exceed gross; capped at gross"
                );
            }

            drafts.push(NewPayroll {
                subject_id: subject.id,
                category,
                period: period.clone(),
                gross: figures.gross,
                deductions: figures.deductions,
                net_pay: figures.net_pay,
                breakdown: figures.breakdown(),
            });
        }

        if drafts.is_empty() {
            info!("No payable subjects; nothing persisted");
            return Ok(Vec::new());
        }

        let mut tx = self.store.begin().await?;
        let mut created = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            match tx.insert_payroll(draft).await {
                Ok(payroll) => created.push(payroll),
                Err(StoreError::Duplicate(detail)) => {
                    warn!(detail = %detail, "Concurrent run detected; rolling back batch");
                    rollback_quietly(tx).await;
                    return Err(already_processed());
                }
                Err(e) => {
                    rollback_quietly(tx).await;
                    return Err(e.into());
                }
            }
        }

        match tx.commit().await {
            Ok(()) => {}
            Err(StoreError::Duplicate(detail)) => {
                warn!(detail = %detail, "Concurrent run committed first");
                return Err(already_processed());
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            created = created.len(),
            skipped = subjects.len() - created.len(),
            "Payroll run completed"
        );
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::deduction_rule::{NewDeductionRule, RuleScope};
    use crate::model::payroll::PayrollStatus;
    use crate::model::salary_component::{ComponentType, NewSalaryComponent};
    use crate::store::memory::MemoryStore;
    use crate::store::{ComponentStore, DeductionRuleStore, PayrollLedger};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn add_component(
        store: &MemoryStore,
        category: SubjectCategory,
        subject_id: u64,
        component_type: ComponentType,
        amount: Decimal,
    ) {
        store
            .create_component(&NewSalaryComponent {
                subject_id,
                category,
                component_type,
                name: component_type.to_string(),
                amount,
                is_taxable: true,
                is_recurring: true,
                active: true,
            })
            .await
            .unwrap();
    }

    async fn add_rule(store: &MemoryStore, percentage: Decimal, applies_to: RuleScope) {
        store
            .create_rule(&NewDeductionRule {
                name: format!("{} {}%", applies_to, percentage),
                percentage,
                applies_to,
                active: true,
            })
            .await
            .unwrap();
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_subject(SubjectCategory::Employee, 1, "Ada Lovelace");
        store.add_subject(SubjectCategory::Employee, 2, "Alan Turing");
        store.add_subject(SubjectCategory::Intern, 1, "Grace Hopper");
        store.add_subject(SubjectCategory::Intern, 2, "Unpaid Intern");

        add_component(&store, SubjectCategory::Employee, 1, ComponentType::Base, dec!(4000)).await;
        add_component(&store, SubjectCategory::Employee, 1, ComponentType::Allowance, dec!(500)).await;
        add_component(&store, SubjectCategory::Employee, 2, ComponentType::Base, dec!(3000)).await;
        add_component(&store, SubjectCategory::Employee, 2, ComponentType::Bonus, dec!(250)).await;
        add_component(&store, SubjectCategory::Employee, 2, ComponentType::Deduction, dec!(100)).await;
        add_component(&store, SubjectCategory::Intern, 1, ComponentType::Base, dec!(800)).await;

        add_rule(&store, dec!(10), RuleScope::Employee).await;
        add_rule(&store, dec!(2), RuleScope::Intern).await;
        store
    }

    fn period() -> Period {
        "2026-01".parse().unwrap()
    }

    #[actix_web::test]
    async fn creates_pending_records_with_additive_figures() {
        let store = seeded().await;
        let runner = PayrollRunner::new(Arc::new(store.clone()));

        let created = runner.run(&period(), SubjectCategory::Employee).await.unwrap();
        assert_eq!(created.len(), 2);

        let ada = &created[0];
        assert_eq!(ada.subject_id, 1);
        assert_eq!(ada.gross, dec!(4500));
        assert_eq!(ada.deductions, dec!(450));
        assert_eq!(ada.net_pay, dec!(4050));

        let alan = &created[1];
        assert_eq!(alan.gross, dec!(3250));
        assert_eq!(alan.deductions, dec!(425));
        assert_eq!(alan.net_pay, dec!(2825));

        for payroll in &created {
            assert_eq!(payroll.status, PayrollStatus::Pending);
            assert_eq!(payroll.net_pay, payroll.gross - payroll.deductions);
            assert!(payroll.exported_at.is_none());
        }
        assert_eq!(store.payroll_count(), 2);
    }

    #[actix_web::test]
    async fn second_run_for_same_period_is_rejected() {
        let store = seeded().await;
        let runner = PayrollRunner::new(Arc::new(store.clone()));

        runner.run(&period(), SubjectCategory::Employee).await.unwrap();
        let err = runner.run(&period(), SubjectCategory::Employee).await.unwrap_err();

        assert!(matches!(err, PayrollError::AlreadyProcessed { .. }));
        assert_eq!(store.payroll_count(), 2);
    }

    #[actix_web::test]
    async fn intern_guard_uses_the_category_records_are_created_with() {
        let store = seeded().await;
        let runner = PayrollRunner::new(Arc::new(store.clone()));

        runner.run(&period(), SubjectCategory::Employee).await.unwrap();
        let interns = runner.run(&period(), SubjectCategory::Intern).await.unwrap();
        assert_eq!(interns.len(), 1);
        assert_eq!(interns[0].gross, dec!(800));
        assert_eq!(interns[0].deductions, dec!(16));

        let again = runner.run(&period(), SubjectCategory::Intern).await;
        assert!(matches!(again, Err(PayrollError::AlreadyProcessed { .. })));
        assert!(store.period_processed(&period(), SubjectCategory::Intern).await.unwrap());
    }

    #[actix_web::test]
    async fn stipendless_intern_is_skipped_without_error() {
        let store = seeded().await;
        let runner = PayrollRunner::new(Arc::new(store.clone()));

        let created = runner.run(&period(), SubjectCategory::Intern).await.unwrap();
        assert!(created.iter().all(|p| p.subject_id != 2));
        assert_eq!(store.payroll_count(), 1);
    }

    #[actix_web::test]
    async fn concurrent_runs_create_exactly_one_set() {
        let store = seeded().await;
        let runner = PayrollRunner::new(Arc::new(store.clone()));
        let period = period();

        let (first, second) = tokio::join!(
            runner.run(&period, SubjectCategory::Employee),
            runner.run(&period, SubjectCategory::Employee)
        );

        let outcomes = [first, second];
        let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
        let rejected = outcomes
            .iter()
            .filter(|r| matches!(r, Err(PayrollError::AlreadyProcessed { .. })))
            .count();
        assert_eq!((succeeded, rejected), (1, 1));
        assert_eq!(store.payroll_count(), 2);
    }

    #[actix_web::test]
    async fn inactive_rules_are_not_applied_in_runs() {
        let store = MemoryStore::new();
        store.add_subject(SubjectCategory::Employee, 9, "Solo");
        add_component(&store, SubjectCategory::Employee, 9, ComponentType::Base, dec!(1000)).await;
        store
            .create_rule(&NewDeductionRule {
                name: "Retired levy".into(),
                percentage: dec!(30),
                applies_to: RuleScope::Both,
                active: false,
            })
            .await
            .unwrap();

        let runner = PayrollRunner::new(Arc::new(store));
        let created = runner.run(&period(), SubjectCategory::Employee).await.unwrap();
        assert_eq!(created[0].deductions, Decimal::ZERO);
        assert_eq!(created[0].net_pay, dec!(1000));
    }
}
