pub mod accounting_entry;
pub mod deduction_rule;
pub mod payroll;
pub mod period;
pub mod role;
pub mod salary_component;
pub mod subject;
