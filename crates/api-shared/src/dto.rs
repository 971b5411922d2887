//! Response bodies for the REST surface.
//!
//! Full clinical resources are returned in their FHIR-aligned JSON form; the types here
//! cover listings, summaries and command results.

use aether_core::{IngestionLogEntry, TriageSummary};
use fhir::PatientRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

/// One row of the patient listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub birth_date: String,
    pub triage_level: Option<String>,
    pub version: u32,
    /// RFC 3339
    pub last_updated: String,
}

impl From<&PatientRecord> for PatientSummary {
    fn from(patient: &PatientRecord) -> Self {
        Self {
            id: patient.id.clone(),
            name: patient
                .primary_name()
                .map(|n| n.display())
                .unwrap_or_default(),
            gender: patient.gender.as_str().to_string(),
            birth_date: patient.birth_date.clone(),
            triage_level: patient.triage_level().map(str::to_string),
            version: patient.version(),
            last_updated: patient.meta.last_updated.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientSummary>,
}

/// One ingestion log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryRes {
    pub id: String,
    /// RFC 3339
    pub timestamp: String,
    pub source: String,
    pub status: String,
    pub raw_snippet: String,
    pub patient_reference: Option<String>,
}

impl From<&IngestionLogEntry> for LogEntryRes {
    fn from(entry: &IngestionLogEntry) -> Self {
        Self {
            id: entry.id.clone(),
            timestamp: entry.timestamp.to_rfc3339(),
            source: entry.source.to_string(),
            status: format!("{:?}", entry.status),
            raw_snippet: entry.raw_snippet.clone(),
            patient_reference: entry.patient_reference.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ListLogsRes {
    pub logs: Vec<LogEntryRes>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TriageSummaryRes {
    pub p1: usize,
    pub p2: usize,
    pub p3: usize,
    pub p4: usize,
    pub unknown: usize,
    pub total: usize,
}

impl From<TriageSummary> for TriageSummaryRes {
    fn from(summary: TriageSummary) -> Self {
        Self {
            p1: summary.p1,
            p2: summary.p2,
            p3: summary.p3,
            p4: summary.p4,
            unknown: summary.unknown,
            total: summary.total(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngestRes {
    /// Rows stored; rejected rows appear in the log instead.
    pub ingested: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResetRes {
    pub patients: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_core::store::demo_patient;
    use aether_core::{LogSource, LogStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn summarises_demo_patient() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let summary = PatientSummary::from(&demo_patient(at));
        assert_eq!(summary.id, "p-demo-1");
        assert_eq!(summary.gender, "other");
        assert_eq!(summary.triage_level.as_deref(), Some("P4"));
        assert_eq!(summary.version, 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["birthDate"], "2000-01-01");
        assert_eq!(json["lastUpdated"], "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn log_entry_uses_wire_names() {
        let entry = IngestionLogEntry {
            id: "log-err-1".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            source: LogSource::Hl7v2,
            status: LogStatus::Failed,
            raw_snippet: "boom".into(),
            patient_reference: None,
        };
        let res = LogEntryRes::from(&entry);
        assert_eq!(res.source, "HL7v2");
        assert_eq!(res.status, "Failed");
    }

    #[test]
    fn triage_total_is_included() {
        let res = TriageSummaryRes::from(TriageSummary {
            p1: 1,
            p2: 2,
            p3: 0,
            p4: 1,
            unknown: 3,
        });
        assert_eq!(res.total, 7);
    }
}
