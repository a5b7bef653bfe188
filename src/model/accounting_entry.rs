use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryType {
    SalaryExpense,
    TaxPayable,
    NetPayable,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryDirection {
    Debit,
    Credit,
}

/// One side of the double-entry posting for an exported payroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "payroll_id": 1,
    "entry_type": "salary_expense",
    "amount": "4500.00",
    "direction": "debit",
    "entry_date": "2026-02-01"
}))]
pub struct AccountingEntry {
    pub id: u64,
    pub payroll_id: u64,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub direction: EntryDirection,
    #[schema(value_type = String, format = "date")]
    pub entry_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccountingEntry {
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub direction: EntryDirection,
    pub entry_date: NaiveDate,
}

impl AccountingEntry {
    pub fn from_new(id: u64, payroll_id: u64, new: &NewAccountingEntry) -> Self {
        Self {
            id,
            payroll_id,
            entry_type: new.entry_type,
            amount: new.amount,
            direction: new.direction,
            entry_date: new.entry_date,
        }
    }
}

/// Sum of debits and sum of credits over a set of entries.
pub fn totals<'a>(entries: impl IntoIterator<Item = &'a AccountingEntry>) -> (Decimal, Decimal) {
    entries
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(debit, credit), e| match e.direction {
            EntryDirection::Debit => (debit + e.amount, credit),
            EntryDirection::Credit => (debit, credit + e.amount),
        })
}
