use std::sync::Arc;

use chrono::{NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::model::accounting_entry::{AccountingEntry, EntryDirection, EntryType, NewAccountingEntry};
use crate::model::payroll::Payroll;
use crate::store::{LedgerTransaction, PayrollRepository, StoreError, rollback_quietly};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExportReceipt {
    pub payroll: Payroll,
    pub entries: Vec<AccountingEntry>,
}

/// Balanced postings for one payroll: debit gross, credit deductions and net.
/// Zero amounts are left out.
pub fn plan_entries(payroll: &Payroll, entry_date: NaiveDate) -> Vec<NewAccountingEntry> {
    [
        (EntryType::SalaryExpense, EntryDirection::Debit, payroll.gross),
        (EntryType::TaxPayable, EntryDirection::Credit, payroll.deductions),
        (EntryType::NetPayable, EntryDirection::Credit, payroll.net_pay),
    ]
    .into_iter()
    .filter(|(_, _, amount)| *amount > Decimal::ZERO)
    .map(|(entry_type, direction, amount)| NewAccountingEntry {
        entry_type,
        amount,
        direction,
        entry_date,
    })
    .collect()
}

/// Posts finalized payrolls to the accounting ledger, once each.
pub struct AccountingExporter {
    store: Arc<dyn PayrollRepository>,
}

impl AccountingExporter {
    pub fn new(store: Arc<dyn PayrollRepository>) -> Self {
        Self { store }
    }

    #[instrument(name = "accounting_export", skip(self))]
    pub async fn export(&self, payroll_id: u64) -> Result<ExportReceipt, PayrollError> {
        let mut tx = self.store.begin().await?;

        let mut payroll = match tx.payroll_for_update(payroll_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                rollback_quietly(tx).await;
                return Err(PayrollError::not_found("payroll", payroll_id));
            }
            Err(e) => {
                rollback_quietly(tx).await;
                return Err(e.into());
            }
        };

        if payroll.is_exported() {
            rollback_quietly(tx).await;
            warn!("Export rejected: payroll already exported");
            return Err(PayrollError::AlreadyExported(payroll_id));
        }

        // TIMESTAMP columns keep whole seconds
        let now = Utc::now().trunc_subsecs(0);
        let plan = plan_entries(&payroll, now.date_naive());
        let mut entries = Vec::with_capacity(plan.len());

        for entry in &plan {
            match tx.insert_entry(payroll_id, entry).await {
                Ok(created) => entries.push(created),
                Err(e) => return Err(abort(tx, payroll_id, e).await),
            }
        }

        if let Err(e) = tx.mark_exported(payroll_id, now).await {
            return Err(abort(tx, payroll_id, e).await);
        }

        if let Err(e) = tx.commit().await {
            return Err(failure(payroll_id, e));
        }

        payroll.exported_at = Some(now);
        info!(entries = entries.len(), gross = %payroll.gross, "Payroll exported to accounting");

        Ok(ExportReceipt { payroll, entries })
    }
}

async fn abort(tx: Box<dyn LedgerTransaction>, payroll_id: u64, cause: StoreError) -> PayrollError {
    rollback_quietly(tx).await;
    failure(payroll_id, cause)
}

/// A unique-index hit means a concurrent export won; anything else is a failed export.
fn failure(payroll_id: u64, cause: StoreError) -> PayrollError {
    match cause {
        StoreError::Duplicate(detail) => {
            warn!(payroll_id, detail = %detail, "Concurrent export detected");
            PayrollError::AlreadyExported(payroll_id)
        }
        source => {
            error!(payroll_id, error = %source, "Accounting export rolled back");
            PayrollError::ExportFailed { payroll_id, source }
        }
    }
}
