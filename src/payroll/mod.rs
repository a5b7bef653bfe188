//! Payroll computation, batch runs, previews, accounting export and payslips.

use rust_decimal::{Decimal, RoundingStrategy};

pub mod aggregator;
pub mod deduction;
pub mod exporter;
pub mod figures;
pub mod notify;
pub mod payslip;
pub mod preview;
pub mod runner;

/// Rounds a monetary amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
