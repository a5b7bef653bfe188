use std::str::FromStr;

use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::PayrollError;

/// Calendar month a payroll run applies to, always held as `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period(String);

impl Period {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn first_day(&self) -> NaiveDate {
        // the string was validated on construction
        NaiveDate::parse_from_str(&format!("{}-01", self.0), "%Y-%m-%d")
            .unwrap_or(NaiveDate::MIN)
    }

    /// Human readable label used on payslips, e.g. `January 2026`.
    pub fn label(&self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

impl FromStr for Period {
    type Err = PayrollError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        let invalid = || PayrollError::Validation(format!("period must be YYYY-MM, got {:?}", raw));

        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        if !bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit) {
            return Err(invalid());
        }

        NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").map_err(|_| invalid())?;

        Ok(Period(s.to_string()))
    }
}

impl TryFrom<String> for Period {
    type Error = PayrollError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.0
    }
}
