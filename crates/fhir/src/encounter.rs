//! Encounter resource. Append-only: encounters are never updated in place.

use crate::datatypes::{Coding, Period, Reference, TextValue};
use crate::wire::Resource;
use serde::{Deserialize, Serialize};

/// Encounter lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncounterStatus {
    Planned,
    Arrived,
    Triaged,
    InProgress,
    Finished,
}

/// A patient visit, linked to its patient by `subject`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EncounterRecord {
    pub resource_type: String,

    pub id: String,

    pub status: EncounterStatus,

    pub class: Coding,

    pub subject: Reference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason_code: Vec<TextValue>,
}

impl Resource for EncounterRecord {
    const RESOURCE_TYPE: &'static str = "Encounter";

    fn id(&self) -> &str {
        &self.id
    }

    fn resource_type(&self) -> &str {
        &self.resource_type
    }
}

impl EncounterRecord {
    /// The first recorded reason for the visit.
    pub fn reason(&self) -> Option<&str> {
        self.reason_code.first().map(|r| r.text.as_str())
    }
}
