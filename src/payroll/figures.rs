use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::aggregator::aggregate;
use super::deduction::percentage_deductions;
use super::round_money;
use crate::model::deduction_rule::DeductionRule;
use crate::model::payroll::PayBreakdown;
use crate::model::salary_component::SalaryComponent;
use crate::model::subject::SubjectCategory;

/// Rounded pay figures for one subject and period.
///
/// `gross` and `deductions` are each rounded once; `net_pay` is derived from
/// the rounded values so `net_pay == gross - deductions` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PayFigures {
    pub base: Decimal,
    pub allowances: Decimal,
    pub bonuses: Decimal,
    pub gross: Decimal,
    pub flat_deductions: Decimal,
    pub percentage_deductions: Decimal,
    pub deductions: Decimal,
    pub net_pay: Decimal,
    /// Deductions exceeded gross and were capped at it.
    pub capped: bool,
}

impl PayFigures {
    /// Subjects without a positive gross are never paid.
    pub fn is_payable(&self) -> bool {
        self.gross > Decimal::ZERO
    }

    pub fn breakdown(&self) -> PayBreakdown {
        PayBreakdown {
            base: self.base,
            allowances: self.allowances,
            bonuses: self.bonuses,
            flat_deductions: self.flat_deductions,
            percentage_deductions: self.percentage_deductions,
        }
    }
}

pub fn compute(
    category: SubjectCategory,
    components: &[SalaryComponent],
    rules: &[DeductionRule],
) -> PayFigures {
    let totals = aggregate(components);
    let deductible_base = totals.deductible_base();
    let percentage = percentage_deductions(deductible_base, rules, category);

    let gross = round_money(deductible_base);
    let mut deductions = round_money(totals.flat_deductions + percentage);
    let capped = deductions > gross && gross > Decimal::ZERO;
    if capped {
        deductions = gross;
    }

    PayFigures {
        base: round_money(totals.base),
        allowances: round_money(totals.allowances),
        bonuses: round_money(totals.bonuses),
        gross,
        flat_deductions: round_money(totals.flat_deductions),
        percentage_deductions: round_money(percentage),
        deductions,
        net_pay: gross - deductions,
        capped,
    }
}
