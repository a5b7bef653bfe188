use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::salary_component::{ComponentType, SalaryComponent};

/// Unrounded sums of a subject's active components, one per component type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComponentTotals {
    pub base: Decimal,
    pub allowances: Decimal,
    pub bonuses: Decimal,
    pub flat_deductions: Decimal,
}

impl ComponentTotals {
    /// `base + allowances + bonuses`, the amount percentage rules apply to.
    pub fn deductible_base(&self) -> Decimal {
        self.base + self.allowances + self.bonuses
    }
}

/// Sums active components by type. Inactive components are ignored.
pub fn aggregate<'a>(components: impl IntoIterator<Item = &'a SalaryComponent>) -> ComponentTotals {
    components
        .into_iter()
        .filter(|c| c.active)
        .fold(ComponentTotals::default(), |mut totals, c| {
            let slot = match c.component_type {
                ComponentType::Base => &mut totals.base,
                ComponentType::Allowance => &mut totals.allowances,
                ComponentType::Bonus => &mut totals.bonuses,
                ComponentType::Deduction => &mut totals.flat_deductions,
            };
            *slot += c.amount;
            totals
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::subject::SubjectCategory;
    use rust_decimal_macros::dec;

    fn component(component_type: ComponentType, amount: Decimal, active: bool) -> SalaryComponent {
        SalaryComponent {
            id: 0,
            subject_id: 1,
            category: SubjectCategory::Employee,
            component_type,
            name: component_type.to_string(),
            amount,
            is_taxable: true,
            is_recurring: true,
            active,
        }
    }

    #[test]
    fn empty_set_sums_to_zero() {
        assert_eq!(aggregate(Vec::<SalaryComponent>::new().iter()), ComponentTotals::default());
    }

    #[test]
    fn sums_by_type_and_skips_inactive() {
        let components = vec![
            component(ComponentType::Base, dec!(4000), true),
            component(ComponentType::Allowance, dec!(300), true),
            component(ComponentType::Allowance, dec!(200), true),
            component(ComponentType::Bonus, dec!(999), false),
            component(ComponentType::Deduction, dec!(25.50), true),
        ];

        let totals = aggregate(&components);
        assert_eq!(totals.base, dec!(4000));
        assert_eq!(totals.allowances, dec!(500));
        assert_eq!(totals.bonuses, dec!(0));
        assert_eq!(totals.flat_deductions, dec!(25.50));
        assert_eq!(totals.deductible_base(), dec!(4500));
    }
}
