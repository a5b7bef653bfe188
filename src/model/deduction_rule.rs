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
pub enum RuleScope {
    Employee,
    Intern,
    Both,
}

impl RuleScope {
    pub fn covers(self, category: SubjectCategory) -> bool {
        matches!(
            (self, category),
            (RuleScope::Both, _)
                | (RuleScope::Employee, SubjectCategory::Employee)
                | (RuleScope::Intern, SubjectCategory::Intern)
        )
    }
}

/// Global percentage withholding applied on top of flat component deductions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Income tax",
    "percentage": "10.00",
    "applies_to": "employee",
    "active": true
}))]
pub struct DeductionRule {
    pub id: u64,
    pub name: String,
    pub percentage: Decimal,
    pub applies_to: RuleScope,
    pub active: bool,
}

impl DeductionRule {
    pub fn from_new(id: u64, new: &NewDeductionRule) -> Self {
        Self {
            id,
            name: new.name.trim().to_string(),
            percentage: new.percentage,
            applies_to: new.applies_to,
            active: new.active,
        }
    }

    /// True when the rule takes part in current computations for `category`.
    pub fn applies(&self, category: SubjectCategory) -> bool {
        self.active && self.applies_to.covers(category)
    }

    pub fn apply(&mut self, patch: DeductionRulePatch) -> Result<(), PayrollError> {
        if let Some(name) = patch.name {
            validate_name(&name)?;
            self.name = name.trim().to_string();
        }
        if let Some(percentage) = patch.percentage {
            validate_percentage(percentage)?;
            self.percentage = percentage;
        }
        self.applies_to = patch.applies_to.unwrap_or(self.applies_to);
        self.active = patch.active.unwrap_or(self.active);
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewDeductionRule {
    #[schema(example = "Income tax")]
    pub name: String,
    #[schema(example = "10.00")]
    pub percentage: Decimal,
    pub applies_to: RuleScope,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NewDeductionRule {
    pub fn validate(&self) -> Result<(), PayrollError> {
        validate_name(&self.name)?;
        validate_percentage(self.percentage)
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DeductionRulePatch {
    pub name: Option<String>,
    #[schema(example = "12.50")]
    pub percentage: Option<Decimal>,
    pub applies_to: Option<RuleScope>,
    pub active: Option<bool>,
}

fn validate_name(name: &str) -> Result<(), PayrollError> {
    if name.trim().is_empty() {
        return Err(PayrollError::Validation("rule name must not be empty".into()));
    }
    Ok(())
}

fn validate_percentage(percentage: Decimal) -> Result<(), PayrollError> {
    if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(PayrollError::Validation(format!(
            "percentage must be between 0 and 100, got {}",
            percentage
        )));
    }
    if percentage.normalize().scale() > 2 {
        return Err(PayrollError::Validation(format!(
            "percentage supports at most 2 decimal places, got {}",
            percentage
        )));
    }
    Ok(())
}
