use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::period::Period;
use crate::model::subject::SubjectCategory;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayrollStatus {
    Pending,
    Paid,
    Failed,
}

/// How a record's gross and deductions were made up when the run computed them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PayBreakdown {
    pub base: Decimal,
    pub allowances: Decimal,
    pub bonuses: Decimal,
    pub flat_deductions: Decimal,
    pub percentage_deductions: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "subject_id": 1001,
    "category": "employee",
    "period": "2026-01",
    "gross": "4500.00",
    "deductions": "450.00",
    "net_pay": "4050.00",
    "breakdown": {
        "base": "4000.00",
        "allowances": "500.00",
        "bonuses": "0.00",
        "flat_deductions": "0.00",
        "percentage_deductions": "450.00"
    },
    "status": "pending",
    "exported_at": null,
    "payslip_link": null,
    "created_at": "2026-02-01T09:00:00Z"
}))]
pub struct Payroll {
    pub id: u64,
    pub subject_id: u64,
    pub category: SubjectCategory,
    #[schema(value_type = String, example = "2026-01")]
    pub period: Period,
    pub gross: Decimal,
    pub deductions: Decimal,
    pub net_pay: Decimal,
    pub breakdown: PayBreakdown,
    pub status: PayrollStatus,
    pub exported_at: Option<DateTime<Utc>>,
    pub payslip_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Figures for one subject, computed by a run and not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayroll {
    pub subject_id: u64,
    pub category: SubjectCategory,
    pub period: Period,
    pub gross: Decimal,
    pub deductions: Decimal,
    pub net_pay: Decimal,
    pub breakdown: PayBreakdown,
}

impl Payroll {
    pub fn from_new(id: u64, new: NewPayroll, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            subject_id: new.subject_id,
            category: new.category,
            period: new.period,
            gross: new.gross,
            deductions: new.deductions,
            net_pay: new.net_pay,
            breakdown: new.breakdown,
            status: PayrollStatus::Pending,
            exported_at: None,
            payslip_link: None,
            created_at,
        }
    }

    pub fn is_exported(&self) -> bool {
        self.exported_at.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PayrollFilter {
    pub period: Option<Period>,
    pub category: Option<SubjectCategory>,
    pub subject_id: Option<u64>,
    pub status: Option<PayrollStatus>,
    pub page: u32,
    pub per_page: u32,
}

impl PayrollFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.per_page)
    }

    pub fn matches(&self, payroll: &Payroll) -> bool {
        self.period.as_ref().is_none_or(|p| *p == payroll.period)
            && self.category.is_none_or(|c| c == payroll.category)
            && self.subject_id.is_none_or(|id| id == payroll.subject_id)
            && self.status.is_none_or(|s| s == payroll.status)
    }
}
