//! Constants used throughout the intake core.
//!
//! Collection names, row defaults and the demo patient identity live here so that the
//! store, the extractor and the surfaces agree on them.

/// Collection holding patient resources.
pub const PATIENTS_COLLECTION: &str = "patients";

/// Collection holding encounter resources.
pub const ENCOUNTERS_COLLECTION: &str = "encounters";

/// Collection holding observation resources.
pub const OBSERVATIONS_COLLECTION: &str = "observations";

/// Collection holding ingestion log entries.
pub const LOGS_COLLECTION: &str = "logs";

/// Every persisted collection, in save order.
pub const COLLECTIONS: [&str; 4] = [
    PATIENTS_COLLECTION,
    ENCOUNTERS_COLLECTION,
    OBSERVATIONS_COLLECTION,
    LOGS_COLLECTION,
];

/// File extension for collection files written by the directory backend.
pub const COLLECTION_FILE_EXTENSION: &str = "json";

/// Default directory for persisted collections when the binaries are given none.
pub const DEFAULT_DATA_DIR: &str = "aether_data";

/// Name used when a row carries no name.
pub const DEFAULT_FULL_NAME: &str = "Unknown Patient";

/// Birth date used when a row carries none.
pub const DEFAULT_DOB: &str = "2000-01-01";

/// Symptom text used when a row carries none.
pub const DEFAULT_SYMPTOMS: &str = "General Update";

/// Triage level used when a row carries none.
pub const DEFAULT_TRIAGE_LEVEL: &str = "P4";

/// Id of the patient seeded into a fresh or reset store.
pub const DEMO_PATIENT_ID: &str = "p-demo-1";
