use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::model::subject::SubjectCategory;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComponentType {
    Base,
    Allowance,
    Bonus,
    Deduction,
}

/// A named monetary line item attached to one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "subject_id": 1001,
    "category": "employee",
    "component_type": "base",
    "name": "Base salary",
    "amount": "4000.00",
    "is_taxable": true,
    "is_recurring": true,
    "active": true
}))]
pub struct SalaryComponent {
    pub id: u64,
    pub subject_id: u64,
    pub category: SubjectCategory,
    pub component_type: ComponentType,
    pub name: String,
    pub amount: Decimal,
    pub is_taxable: bool,
    pub is_recurring: bool,
    pub active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewSalaryComponent {
    #[schema(example = 1001)]
    pub subject_id: u64,
    pub category: SubjectCategory,
    pub component_type: ComponentType,
    #[schema(example = "Housing allowance")]
    pub name: String,
    #[schema(example = "500.00")]
    pub amount: Decimal,
    #[serde(default = "default_true")]
    pub is_taxable: bool,
    #[serde(default = "default_true")]
    pub is_recurring: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl NewSalaryComponent {
    pub fn validate(&self) -> Result<(), PayrollError> {
        validate_name(&self.name)?;
        validate_amount(self.amount)
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SalaryComponentPatch {
    pub component_type: Option<ComponentType>,
    pub name: Option<String>,
    #[schema(example = "650.00")]
    pub amount: Option<Decimal>,
    pub is_taxable: Option<bool>,
    pub is_recurring: Option<bool>,
    pub active: Option<bool>,
}

impl SalaryComponent {
    pub fn from_new(id: u64, new: &NewSalaryComponent) -> Self {
        Self {
            id,
            subject_id: new.subject_id,
            category: new.category,
            component_type: new.component_type,
            name: new.name.trim().to_string(),
            amount: new.amount,
            is_taxable: new.is_taxable,
            is_recurring: new.is_recurring,
            active: new.active,
        }
    }

    /// Merges a partial update and re-validates the result.
    pub fn apply(&mut self, patch: SalaryComponentPatch) -> Result<(), PayrollError> {
        if let Some(component_type) = patch.component_type {
            self.component_type = component_type;
        }
        if let Some(name) = patch.name {
            validate_name(&name)?;
            self.name = name.trim().to_string();
        }
        if let Some(amount) = patch.amount {
            validate_amount(amount)?;
            self.amount = amount;
        }
        self.is_taxable = patch.is_taxable.unwrap_or(self.is_taxable);
        self.is_recurring = patch.is_recurring.unwrap_or(self.is_recurring);
        self.active = patch.active.unwrap_or(self.active);
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), PayrollError> {
    if name.trim().is_empty() {
        return Err(PayrollError::Validation("component name must not be empty".into()));
    }
    Ok(())
}

/// Largest value a DECIMAL(12, 2) column holds.
const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

fn validate_amount(amount: Decimal) -> Result<(), PayrollError> {
    if amount < Decimal::ZERO {
        return Err(PayrollError::Validation(format!(
            "component amount must not be negative, got {}",
            amount
        )));
    }
    if amount.normalize().scale() > 2 {
        return Err(PayrollError::Validation(format!(
            "component amount supports at most 2 decimal places, got {}",
            amount
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(PayrollError::Validation(format!(
            "component amount must not exceed {}, got {}",
            MAX_AMOUNT, amount
        )));
    }
    Ok(())
}
