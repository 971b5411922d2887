//! Patient resource.
//!
//! A patient is the only mutable resource in the store: re-ingesting the same identifier
//! merges the newer submission over the stored one and bumps `meta.versionId`.

use crate::datatypes::{ContactPoint, Extension, HumanName, Identifier, Meta};
use crate::wire::Resource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extension URL carrying the triage level (P1..P4) on a patient.
pub const TRIAGE_EXTENSION_URL: &str = "http://aetherhealth.io/triage";

/// Administrative gender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
            Gender::Unknown => "unknown",
        }
    }
}

/// Patient demographics plus the triage extension and version lineage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PatientRecord {
    pub resource_type: String,

    pub id: String,

    pub active: bool,

    #[serde(default)]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    pub gender: Gender,

    pub birth_date: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    pub meta: Meta,
}

impl Resource for PatientRecord {
    const RESOURCE_TYPE: &'static str = "Patient";

    fn id(&self) -> &str {
        &self.id
    }

    fn resource_type(&self) -> &str {
        &self.resource_type
    }
}

impl PatientRecord {
    /// The first (primary) name, if any.
    pub fn primary_name(&self) -> Option<&HumanName> {
        self.name.first()
    }

    /// The triage level carried by the triage extension, if present.
    pub fn triage_level(&self) -> Option<&str> {
        self.extension
            .iter()
            .find(|ext| ext.url == TRIAGE_EXTENSION_URL)
            .and_then(|ext| ext.value_string.as_deref())
    }

    pub fn version(&self) -> u32 {
        self.meta.version_id
    }

    /// Merge a newer submission for the same patient over this stored record.
    ///
    /// The merge is shallow and the newer record wins every field, empty ones included.
    /// Only `id` is kept from the stored record. The version is this record's version plus
    /// one and `lastUpdated` becomes `at`, whatever `newer.meta` says.
    pub fn merged_with(self, newer: PatientRecord, at: DateTime<Utc>) -> PatientRecord {
        PatientRecord {
            id: self.id,
            meta: Meta {
                version_id: self.meta.version_id.saturating_add(1),
                last_updated: at,
            },
            ..newer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{ContactSystem, NameUse};
    use crate::wire::parse_resources;
    use crate::FhirError;

    const SAMPLE: &str = r#"{
  "resourceType": "Patient",
  "id": "p-1234",
  "active": true,
  "name": [{ "family": "Doe", "given": ["Jane"] }],
  "telecom": [{ "system": "email", "value": "jane@example.com" }],
  "gender": "female",
  "birthDate": "1990-05-01",
  "identifier": [{ "system": "urn:mrn", "value": "1234" }],
  "extension": [{ "url": "http://aetherhealth.io/triage", "valueString": "P2" }],
  "meta": { "versionId": "3", "lastUpdated": "2024-01-01T10:00:00Z" }
}"#;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn round_trips_sample_json() {
        let patient = PatientRecord::from_json(SAMPLE).expect("parse json");
        assert_eq!(patient.triage_level(), Some("P2"));
        assert_eq!(patient.version(), 3);

        let output = patient.to_json().expect("render");
        let reparsed = PatientRecord::from_json(&output).expect("reparse");
        assert_eq!(patient, reparsed);
    }

    #[test]
    fn strict_validation_rejects_unknown_keys() {
        let input = SAMPLE.replace("\"active\": true,", "\"active\": true, \"unexpected_key\": 1,");
        let err = PatientRecord::from_json(&input).expect_err("should reject unknown key");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("unexpected_key")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn strict_validation_reports_failing_path() {
        let input = SAMPLE.replace("\"given\": [\"Jane\"]", "\"given\": \"Jane\"");
        let err = PatientRecord::from_json(&input).expect_err("should reject wrong type");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("given"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_resource_type() {
        let input = SAMPLE.replace("\"Patient\"", "\"Encounter\"");
        let err = PatientRecord::from_json(&input).expect_err("should reject resource type");
        assert!(matches!(err, FhirError::InvalidInput(msg) if msg.contains("Encounter")));
    }

    #[test]
    fn parses_collections() {
        let list = format!("[{SAMPLE}]");
        let patients: Vec<PatientRecord> = parse_resources(&list).expect("parse list");
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id, "p-1234");
    }

    #[test]
    fn merge_bumps_version_and_prefers_newer_fields() {
        let stored = PatientRecord::from_json(SAMPLE).unwrap();
        let mut newer = stored.clone();
        newer.name = vec![HumanName {
            use_type: Some(NameUse::Usual),
            family: "Smith".into(),
            given: vec!["Jane".into()],
        }];
        newer.telecom = vec![];
        newer.gender = Gender::Male;
        newer.meta = Meta::first(at("2024-02-01T00:00:00Z"));

        let merged = stored.clone().merged_with(newer, at("2024-03-01T00:00:00Z"));

        assert_eq!(merged.version(), 4);
        assert_eq!(merged.meta.last_updated, at("2024-03-01T00:00:00Z"));
        assert_eq!(merged.primary_name().unwrap().family, "Smith");
        assert_eq!(merged.gender, Gender::Male);
        assert!(merged.telecom.is_empty());
        assert_eq!(merged.id, "p-1234");
    }

    #[test]
    fn merge_replaces_stored_fields_with_empty_newer_values() {
        let stored = PatientRecord::from_json(SAMPLE).unwrap();
        assert_eq!(stored.telecom[0].system, ContactSystem::Email);
        let mut newer = stored.clone();
        newer.id = "p-other".into();
        newer.telecom = vec![];
        newer.birth_date = String::new();
        newer.identifier = vec![];

        let merged = stored.merged_with(newer, at("2024-03-01T00:00:00Z"));

        assert_eq!(merged.id, "p-1234");
        assert!(merged.telecom.is_empty());
        assert!(merged.birth_date.is_empty());
        assert!(merged.identifier.is_empty());
        assert_eq!(merged.triage_level(), Some("P2"));
    }

    #[test]
    fn yaml_export_uses_fhir_keys() {
        let patient = PatientRecord::from_json(SAMPLE).unwrap();
        let yaml = patient.to_yaml().expect("render yaml");
        assert!(yaml.contains("resourceType: Patient"));
        assert!(yaml.contains("birthDate:"));
        assert!(yaml.contains("valueString: P2"));
    }
}
