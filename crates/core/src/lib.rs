//! # Aether Core
//!
//! Core ingestion logic for the Aether intake pipeline.
//!
//! This crate turns loosely structured form exports into versioned clinical records:
//! - header analysis ([`SchemaDetector`]) and row normalisation ([`RowExtractor`])
//! - the round trip through the wire message format (the `hl7` crate)
//! - persistent collections with upsert-merge and append semantics ([`RecordStore`])
//! - batch sequencing and the ingestion log ([`IngestionOrchestrator`])
//!
//! **No API concerns**: HTTP handlers and command-line parsing belong in the root binary and
//! `aether-cli`.

pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod log;
pub mod schema;
pub mod source;
pub mod store;
pub mod validation;

pub use config::CoreConfig;
pub use error::{IngestError, IngestResult};
pub use extract::{split_row, RowExtractor};
pub use ingest::IngestionOrchestrator;
pub use log::{IngestionLogEntry, LogSource, LogStatus};
pub use schema::{CanonicalField, ColumnMap, SchemaDetector, KEYWORD_TABLE};
pub use source::{normalize_sheet_url, FileSource, SourceFetcher, StaticSource};
pub use store::{
    JsonDirBackend, MemoryBackend, RecordStore, StorageBackend, SubjectMatch, TriageSummary,
};
