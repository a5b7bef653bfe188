//! Persistence seams for the payroll engine.
//!
//! Every store is an async trait so the engine can run against MySQL in
//! production and against the in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::accounting_entry::{AccountingEntry, NewAccountingEntry};
use crate::model::deduction_rule::{DeductionRule, NewDeductionRule};
use crate::model::payroll::{NewPayroll, Payroll, PayrollFilter, PayrollStatus};
use crate::model::period::Period;
use crate::model::salary_component::{NewSalaryComponent, SalaryComponent};
use crate::model::subject::{Subject, SubjectCategory};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("unique constraint violated: {0}")]
    Duplicate(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ComponentStore: Send + Sync {
    async fn create_component(&self, new: &NewSalaryComponent) -> Result<SalaryComponent, StoreError>;

    async fn find_component(&self, id: u64) -> Result<Option<SalaryComponent>, StoreError>;

    /// Overwrites a component previously read with `find_component`.
    async fn update_component(&self, component: &SalaryComponent) -> Result<(), StoreError>;

    async fn delete_component(&self, id: u64) -> Result<bool, StoreError>;

    /// All components of one subject, active or not.
    async fn components_for(
        &self,
        category: SubjectCategory,
        subject_id: u64,
    ) -> Result<Vec<SalaryComponent>, StoreError>;
}

#[async_trait]
pub trait DeductionRuleStore: Send + Sync {
    async fn create_rule(&self, new: &NewDeductionRule) -> Result<DeductionRule, StoreError>;

    async fn find_rule(&self, id: u64) -> Result<Option<DeductionRule>, StoreError>;

    async fn update_rule(&self, rule: &DeductionRule) -> Result<(), StoreError>;

    async fn delete_rule(&self, id: u64) -> Result<bool, StoreError>;

    async fn list_rules(&self) -> Result<Vec<DeductionRule>, StoreError>;
}

#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    /// Subjects eligible for a run, ordered by id.
    async fn payable_subjects(&self, category: SubjectCategory) -> Result<Vec<Subject>, StoreError>;

    async fn find_subject(
        &self,
        category: SubjectCategory,
        id: u64,
    ) -> Result<Option<Subject>, StoreError>;
}

#[async_trait]
pub trait PayrollLedger: Send + Sync {
    async fn period_processed(
        &self,
        period: &Period,
        category: SubjectCategory,
    ) -> Result<bool, StoreError>;

    async fn find_payroll(&self, id: u64) -> Result<Option<Payroll>, StoreError>;

    async fn list_payrolls(&self, filter: &PayrollFilter) -> Result<(Vec<Payroll>, i64), StoreError>;

    async fn update_payroll_status(
        &self,
        id: u64,
        status: PayrollStatus,
    ) -> Result<Option<Payroll>, StoreError>;

    async fn set_payslip_link(&self, id: u64, link: &str) -> Result<bool, StoreError>;

    async fn entries_for(&self, payroll_id: u64) -> Result<Vec<AccountingEntry>, StoreError>;

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError>;
}

/// Writes that must land together. Dropping without `commit` discards them.
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn insert_payroll(&mut self, new: &NewPayroll) -> Result<Payroll, StoreError>;

    /// Reads the payroll and holds it until the transaction ends.
    async fn payroll_for_update(&mut self, id: u64) -> Result<Option<Payroll>, StoreError>;

    async fn insert_entry(
        &mut self,
        payroll_id: u64,
        entry: &NewAccountingEntry,
    ) -> Result<AccountingEntry, StoreError>;

    /// Fails with `Duplicate` if the payroll was exported meanwhile.
    async fn mark_exported(&mut self, payroll_id: u64, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Everything the payroll engine and the HTTP layer read or write.
pub trait PayrollRepository: ComponentStore + DeductionRuleStore + SubjectDirectory + PayrollLedger {}

impl<T> PayrollRepository for T where
    T: ComponentStore + DeductionRuleStore + SubjectDirectory + PayrollLedger
{
}

/// Rolls back, logging instead of masking the error that caused the abort.
pub async fn rollback_quietly(tx: Box<dyn LedgerTransaction>) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "Rollback failed");
    }
}
