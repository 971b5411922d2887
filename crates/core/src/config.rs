//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Core code never reads environment variables; the binaries do that and hand the values
//! over here, so tests and multi-threaded runtimes see one consistent view.

use crate::log::LogSource;
use crate::store::{JsonDirBackend, MemoryBackend, RecordStore, StorageBackend};
use crate::validation::validate_wire_identifier;
use crate::IngestResult;
use chrono::{DateTime, Utc};
use hl7::{HeaderIdentity, MessageEncoder};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, Default)]
pub struct CoreConfig {
    data_dir: Option<PathBuf>,
    header: HeaderIdentity,
    source: LogSource,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `data_dir` of `None` keeps every collection in memory for the life of the process.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidInput` if any header identifier is empty or contains a
    /// wire delimiter.
    pub fn new(
        data_dir: Option<PathBuf>,
        header: HeaderIdentity,
        source: LogSource,
    ) -> IngestResult<Self> {
        validate_wire_identifier("sending application", &header.sending_application)?;
        validate_wire_identifier("sending facility", &header.sending_facility)?;
        validate_wire_identifier("receiving application", &header.receiving_application)?;
        validate_wire_identifier("receiving facility", &header.receiving_facility)?;

        Ok(Self {
            data_dir,
            header,
            source,
        })
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn header(&self) -> &HeaderIdentity {
        &self.header
    }

    pub fn source(&self) -> LogSource {
        self.source
    }

    pub fn encoder(&self) -> MessageEncoder {
        MessageEncoder::new(self.header.clone())
    }

    /// Open the record store this configuration points at.
    pub fn open_store(&self, at: DateTime<Utc>) -> IngestResult<RecordStore> {
        let backend: Box<dyn StorageBackend> = match &self.data_dir {
            Some(dir) => Box::new(JsonDirBackend::new(dir)?),
            None => Box::new(MemoryBackend::default()),
        };
        RecordStore::open(backend, at)
    }
}

/// Build a header identity from optional overrides, keeping defaults for anything unset
/// or blank.
pub fn header_from_overrides(
    sending_application: Option<String>,
    sending_facility: Option<String>,
) -> HeaderIdentity {
    let mut header = HeaderIdentity::default();
    let non_blank = |v: Option<String>| {
        v.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    if let Some(app) = non_blank(sending_application) {
        header.sending_application = app;
    }
    if let Some(facility) = non_blank(sending_facility) {
        header.sending_facility = facility;
    }
    header
}
