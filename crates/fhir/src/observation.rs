//! Observation resource. Append-only, one per vital sign reported.

use crate::datatypes::{CodeableConcept, Reference};
use crate::wire::{nan_as_null, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// UCUM system URL used for every quantity.
pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// Observation result status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationStatus {
    Final,
    Preliminary,
}

/// A measured amount.
///
/// `value` is NaN when the source text was not a number; it is persisted as `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Quantity {
    #[serde(with = "nan_as_null")]
    pub value: f64,
    pub unit: String,
    pub system: String,
    pub code: String,
}

impl Quantity {
    /// A UCUM quantity whose code mirrors its unit.
    pub fn ucum(value: f64, unit: &str) -> Self {
        Self {
            value,
            unit: unit.to_owned(),
            system: UCUM_SYSTEM.to_owned(),
            code: unit.to_owned(),
        }
    }
}

/// A single measurement about a patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ObservationRecord {
    pub resource_type: String,

    pub id: String,

    pub status: ObservationStatus,

    pub code: CodeableConcept,

    pub subject: Reference,

    pub effective_date_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,
}

impl Resource for ObservationRecord {
    const RESOURCE_TYPE: &'static str = "Observation";

    fn id(&self) -> &str {
        &self.id
    }

    fn resource_type(&self) -> &str {
        &self.resource_type
    }
}

impl ObservationRecord {
    /// The code of the first coding, e.g. a LOINC code.
    pub fn primary_code(&self) -> Option<&str> {
        self.code.coding.first().map(|c| c.code.as_str())
    }
}
