//! FHIR-aligned clinical resources for the intake pipeline.
//!
//! This crate provides the **output model** of the pipeline: simplified Patient, Encounter
//! and Observation resources, plus format helpers to move them across boundaries:
//! - JSON (persisted collections, REST responses)
//! - YAML (human-readable export)
//! - collection [`Bundle`]s (one patient with its encounters and observations)
//!
//! This crate focuses on:
//! - FHIR semantic alignment (camelCase keys, `resourceType`, `meta.versionId`)
//! - strict deserialisation that reports the failing path
//! - merge rules for versioned patient resources
//!
//! It is not a general FHIR implementation: only the fields the pipeline produces exist.

pub mod bundle;
pub mod datatypes;
pub mod encounter;
pub mod observation;
pub mod patient;
pub mod wire;

// Re-export record types
pub use bundle::{Bundle, BundleEntry, BundleResource};
pub use encounter::{EncounterRecord, EncounterStatus};
pub use observation::{ObservationRecord, ObservationStatus, Quantity};
pub use patient::{Gender, PatientRecord, TRIAGE_EXTENSION_URL};

// Re-export shared datatypes
pub use datatypes::{
    CodeableConcept, Coding, ContactPoint, ContactSystem, Extension, HumanName, Identifier,
    Meta, NameUse, Period, Reference, TextValue,
};

pub use wire::Resource;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
