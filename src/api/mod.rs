pub mod deduction_rule;
pub mod payroll;
pub mod salary_component;
