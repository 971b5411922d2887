//! Ingestion log entries.
//!
//! One entry is written per ingestion outcome: a success per stored row, a failure per
//! rejected row, and a single failure when a whole batch is aborted. Entries are immutable
//! once appended.

use aether_ids::IdGenerator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an ingested payload came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSource {
    #[serde(rename = "HL7v2")]
    Hl7v2,
    #[default]
    GoogleForms,
    ExternalXML,
    WearableAPI,
}

impl LogSource {
    pub const ALL: [LogSource; 4] = [
        LogSource::Hl7v2,
        LogSource::GoogleForms,
        LogSource::ExternalXML,
        LogSource::WearableAPI,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Hl7v2 => "HL7v2",
            LogSource::GoogleForms => "GoogleForms",
            LogSource::ExternalXML => "ExternalXML",
            LogSource::WearableAPI => "WearableAPI",
        }
    }

    /// Case-insensitive lookup by wire name.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(input))
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStatus {
    Success,
    Failed,
    Pending,
}

/// A single ingestion outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IngestionLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub status: LogStatus,
    /// The wire message for successes, the error text for failures.
    pub raw_snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_reference: Option<String>,
}

impl IngestionLogEntry {
    /// A stored row, carrying the message it travelled as.
    pub fn success(
        ids: &mut IdGenerator,
        source: LogSource,
        message: String,
        patient_id: &str,
    ) -> Self {
        Self {
            id: ids.log_id(),
            timestamp: ids.now(),
            source,
            status: LogStatus::Success,
            raw_snippet: message,
            patient_reference: Some(fhir::Reference::patient(patient_id).reference),
        }
    }

    /// A rejected row. The batch carries on.
    pub fn row_failure(ids: &mut IdGenerator, source: LogSource, error: String) -> Self {
        Self {
            id: ids.log_id(),
            timestamp: ids.now(),
            source,
            status: LogStatus::Failed,
            raw_snippet: error,
            patient_reference: None,
        }
    }

    /// An aborted batch.
    pub fn batch_failure(ids: &mut IdGenerator, source: LogSource, error: String) -> Self {
        Self {
            id: ids.failure_log_id(),
            timestamp: ids.now(),
            source,
            status: LogStatus::Failed,
            raw_snippet: error,
            patient_reference: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_ids::{FixedClock, SequenceRandom};
    use chrono::TimeZone;

    fn ids() -> IdGenerator {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        IdGenerator::new(
            Box::new(FixedClock::new(at)),
            Box::new(SequenceRandom::new(vec![42])),
        )
    }

    #[test]
    fn success_entry_references_patient() {
        let entry = IngestionLogEntry::success(&mut ids(), LogSource::GoogleForms, "MSH|".into(), "p-1");
        assert_eq!(entry.status, LogStatus::Success);
        assert_eq!(entry.patient_reference.as_deref(), Some("Patient/p-1"));
        assert_eq!(entry.id, "log-1700000000000-42");
    }

    #[test]
    fn batch_failure_uses_error_id() {
        let entry = IngestionLogEntry::batch_failure(&mut ids(), LogSource::GoogleForms, "boom".into());
        assert_eq!(entry.id, "log-err-1700000000000");
        assert_eq!(entry.status, LogStatus::Failed);
        assert!(entry.patient_reference.is_none());
    }

    #[test]
    fn serialises_with_wire_names() {
        let entry = IngestionLogEntry::row_failure(&mut ids(), LogSource::Hl7v2, "bad row".into());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["source"], "HL7v2");
        assert_eq!(json["status"], "Failed");
        assert_eq!(json["rawSnippet"], "bad row");
        assert!(json.get("patientReference").is_none());
    }

    #[test]
    fn source_lookup_ignores_case() {
        assert_eq!(LogSource::parse("hl7v2"), Some(LogSource::Hl7v2));
        assert_eq!(LogSource::parse(" WearableAPI "), Some(LogSource::WearableAPI));
        assert_eq!(LogSource::parse("fax"), None);
    }
}
