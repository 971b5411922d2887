//! Building blocks shared by the resource types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Purpose of a human name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameUse {
    /// Official name.
    Official,
    /// Usual/preferred name.
    Usual,
}

/// A person's name split into family and given parts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumanName {
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<NameUse>,

    #[serde(default)]
    pub family: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
}

impl HumanName {
    /// Renders the name as "given family", skipping empty parts.
    pub fn display(&self) -> String {
        self.given
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.family.as_str()))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Channel of a contact point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactSystem {
    Phone,
    Email,
}

/// A phone number or email address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactPoint {
    pub system: ContactSystem,
    pub value: String,
}

/// An identifier issued by some system, for example a medical record number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

/// A simple string-valued extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Extension {
    pub url: String,

    #[serde(rename = "valueString", default, skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
}

/// A code from a terminology.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coding {
    pub system: String,
    pub code: String,
    pub display: String,
}

/// One or more codings plus an optional text rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Free-text-only concept, used for encounter reasons.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextValue {
    pub text: String,
}

/// A reference to another resource, e.g. `Patient/p-1234`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    pub reference: String,
}

impl Reference {
    /// Builds a `Patient/<id>` reference.
    pub fn patient(id: &str) -> Self {
        Self {
            reference: format!("Patient/{id}"),
        }
    }

    /// Returns true if this reference names exactly the given patient id,
    /// either as `Patient/<id>` or as the bare id.
    pub fn points_to_patient(&self, id: &str) -> bool {
        match self.reference.strip_prefix("Patient/") {
            Some(rest) => rest == id,
            None => self.reference == id,
        }
    }
}

/// A time range; `end` is open while the encounter is ongoing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Period {
    pub start: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// Version lineage of a resource.
///
/// `version_id` is serialised as a string to match FHIR's `meta.versionId`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Meta {
    #[serde(rename = "versionId", with = "version_string")]
    pub version_id: u32,

    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

impl Meta {
    pub fn first(at: DateTime<Utc>) -> Self {
        Self {
            version_id: 1,
            last_updated: at,
        }
    }
}

mod version_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let version = raw
            .parse::<u32>()
            .map_err(|e| serde::de::Error::custom(format!("invalid versionId '{raw}': {e}")))?;
        if version == 0 {
            return Err(serde::de::Error::custom("versionId must be at least 1"));
        }
        Ok(version)
    }
}
