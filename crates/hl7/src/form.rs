//! Normalised form row: the encoder's input.

use serde::{Deserialize, Serialize};

/// Administrative sex as carried in `PID-8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Single-character wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }
}

/// One form submission after column mapping and defaults.
///
/// Exists only for the duration of one row's pass through the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRow {
    pub timestamp: String,
    #[serde(default)]
    pub patient_id: Option<String>,
    pub full_name: String,
    pub dob: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub symptoms: String,
    pub triage_level: String,
    #[serde(default)]
    pub heart_rate: Option<String>,
    #[serde(default)]
    pub temp: Option<String>,
    /// Forms never carry sex today; when absent the encoder flips a coin.
    #[serde(default)]
    pub sex: Option<Sex>,
}

impl FormRow {
    /// Splits `full_name` at the first space into `(given, family)`.
    ///
    /// A single-word name yields an empty family name.
    pub fn given_and_family(&self) -> (&str, &str) {
        let name = self.full_name.trim();
        match name.split_once(' ') {
            Some((given, family)) => (given, family.trim_start()),
            None => (name, ""),
        }
    }

    /// The supplied patient id, if non-blank.
    pub fn supplied_id(&self) -> Option<&str> {
        non_blank(self.patient_id.as_deref())
    }

    pub fn heart_rate_value(&self) -> Option<&str> {
        non_blank(self.heart_rate.as_deref())
    }

    pub fn temperature_value(&self) -> Option<&str> {
        non_blank(self.temp.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
