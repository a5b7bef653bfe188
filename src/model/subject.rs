use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Which kind of payable person a record belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubjectCategory {
    Employee,
    Intern,
}

impl SubjectCategory {
    pub const ALL: [SubjectCategory; 2] = [SubjectCategory::Employee, SubjectCategory::Intern];
}

/// An employee or intern that can be paid for a period.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "category": "employee",
    "name": "John Doe",
    "email": "john.doe@company.com"
}))]
pub struct Subject {
    pub id: u64,
    pub category: SubjectCategory,
    pub name: String,
    pub email: Option<String>,
}
