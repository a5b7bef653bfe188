use rust_decimal::Decimal;

use crate::model::deduction_rule::DeductionRule;
use crate::model::subject::SubjectCategory;

/// `Σ base × percentage / 100` over the rules that currently apply to `category`.
///
/// Only active rules are ever applied, in runs and previews alike. The result
/// is not rounded.
pub fn percentage_deductions(
    deductible_base: Decimal,
    rules: &[DeductionRule],
    category: SubjectCategory,
) -> Decimal {
    rules
        .iter()
        .filter(|rule| rule.applies(category))
        .map(|rule| deductible_base * rule.percentage / Decimal::ONE_HUNDRED)
        .sum()
}
