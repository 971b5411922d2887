//! Persistent record collections.
//!
//! [`RecordStore`] keeps four ordered collections (patients, encounters, observations and
//! ingestion logs) in memory and writes each one through a [`StorageBackend`] whenever it
//! changes. Patients are upserted and versioned; everything else is append-only.
//!
//! ## Storage layout
//!
//! [`JsonDirBackend`] writes one pretty-printed JSON array per collection:
//!
//! ```text
//! <data_dir>/
//!   patients.json
//!   encounters.json
//!   observations.json
//!   logs.json
//! ```
//!
//! Each file is replaced atomically (temp file + rename).

use crate::constants::{
    COLLECTIONS, COLLECTION_FILE_EXTENSION, DEMO_PATIENT_ID, ENCOUNTERS_COLLECTION,
    LOGS_COLLECTION, OBSERVATIONS_COLLECTION, PATIENTS_COLLECTION,
};
use crate::log::IngestionLogEntry;
use crate::{IngestError, IngestResult};
use aether_types::TriageLevel;
use chrono::{DateTime, Utc};
use fhir::wire::{parse_json, parse_resources, render_json};
use fhir::{
    Bundle, ContactPoint, ContactSystem, EncounterRecord, Extension, Gender, HumanName, Meta, NameUse,
    ObservationRecord, PatientRecord, Reference, Resource, TRIAGE_EXTENSION_URL,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Raw load/save of named collections.
pub trait StorageBackend: Send {
    /// The stored text of `collection`, or `None` if it has never been saved.
    fn load(&self, collection: &str) -> IngestResult<Option<String>>;

    fn save(&mut self, collection: &str, text: &str) -> IngestResult<()>;
}

/// Keeps collections in process memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    collections: HashMap<String, String>,
}

impl StorageBackend for MemoryBackend {
    fn load(&self, collection: &str) -> IngestResult<Option<String>> {
        Ok(self.collections.get(collection).cloned())
    }

    fn save(&mut self, collection: &str, text: &str) -> IngestResult<()> {
        self.collections
            .insert(collection.to_string(), text.to_string());
        Ok(())
    }
}

/// One `<collection>.json` file per collection under a data directory.
#[derive(Clone, Debug)]
pub struct JsonDirBackend {
    dir: PathBuf,
}

impl JsonDirBackend {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> IngestResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| IngestError::Storage {
            collection: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, collection: &str) -> PathBuf {
        self.dir
            .join(format!("{collection}.{COLLECTION_FILE_EXTENSION}"))
    }
}

impl StorageBackend for JsonDirBackend {
    fn load(&self, collection: &str) -> IngestResult<Option<String>> {
        let path = self.path_for(collection);
        if !path.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| IngestError::Storage {
                collection: collection.to_string(),
                source,
            })
    }

    fn save(&mut self, collection: &str, text: &str) -> IngestResult<()> {
        let storage_err = |source| IngestError::Storage {
            collection: collection.to_string(),
            source,
        };
        let path = self.path_for(collection);
        let tmp = self
            .dir
            .join(format!(".{collection}.{COLLECTION_FILE_EXTENSION}.tmp"));
        fs::write(&tmp, text).map_err(storage_err)?;
        fs::rename(&tmp, &path).map_err(storage_err)
    }
}

/// How encounter and observation subjects are matched against a patient id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubjectMatch {
    /// `Patient/<id>` or the bare id, nothing else.
    #[default]
    Exact,
    /// Any reference containing the id. `p-1` also matches `Patient/p-12`.
    Contains,
}

impl SubjectMatch {
    pub fn matches(&self, subject: &Reference, patient_id: &str) -> bool {
        match self {
            SubjectMatch::Exact => subject.points_to_patient(patient_id),
            SubjectMatch::Contains => subject.reference.contains(patient_id),
        }
    }
}

/// Patient counts per triage level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageSummary {
    pub p1: usize,
    pub p2: usize,
    pub p3: usize,
    pub p4: usize,
    /// Patients with no triage extension or an unrecognised level.
    pub unknown: usize,
}

impl TriageSummary {
    pub fn total(&self) -> usize {
        self.p1 + self.p2 + self.p3 + self.p4 + self.unknown
    }
}

/// The patient every fresh or reset store starts with.
pub fn demo_patient(at: DateTime<Utc>) -> PatientRecord {
    PatientRecord {
        resource_type: PatientRecord::RESOURCE_TYPE.to_string(),
        id: DEMO_PATIENT_ID.to_string(),
        active: true,
        name: vec![HumanName {
            use_type: Some(NameUse::Official),
            family: "Demo".into(),
            given: vec!["User".into()],
        }],
        telecom: vec![ContactPoint {
            system: ContactSystem::Email,
            value: "demo@example.com".into(),
        }],
        gender: Gender::Other,
        birth_date: "2000-01-01".into(),
        identifier: vec![],
        extension: vec![Extension {
            url: TRIAGE_EXTENSION_URL.to_string(),
            value_string: Some(TriageLevel::P4.as_str().to_string()),
        }],
        meta: Meta::first(at),
    }
}

/// Patient, encounter, observation and log collections over a storage backend.
pub struct RecordStore {
    backend: Box<dyn StorageBackend>,
    patients: Vec<PatientRecord>,
    encounters: Vec<EncounterRecord>,
    observations: Vec<ObservationRecord>,
    logs: Vec<IngestionLogEntry>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("patients", &self.patients.len())
            .field("encounters", &self.encounters.len())
            .field("observations", &self.observations.len())
            .field("logs", &self.logs.len())
            .finish()
    }
}

impl RecordStore {
    /// Load every collection from `backend`.
    ///
    /// A backend that has never stored patients is seeded with the demo patient and
    /// empty collections, stamped at `at`.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Serialization` with the failing path if a stored collection
    /// does not match its schema, or `IngestError::Storage` if the backend cannot be read.
    pub fn open(backend: Box<dyn StorageBackend>, at: DateTime<Utc>) -> IngestResult<Self> {
        let mut store = Self {
            backend,
            patients: Vec::new(),
            encounters: Vec::new(),
            observations: Vec::new(),
            logs: Vec::new(),
        };

        let Some(patients) = store.backend.load(PATIENTS_COLLECTION)? else {
            tracing::info!("no stored patients found, seeding demo patient");
            store.reset(at)?;
            return Ok(store);
        };
        store.patients = parse_resources(&patients)?;
        if let Some(text) = store.backend.load(ENCOUNTERS_COLLECTION)? {
            store.encounters = parse_resources(&text)?;
        }
        if let Some(text) = store.backend.load(OBSERVATIONS_COLLECTION)? {
            store.observations = parse_resources(&text)?;
        }
        if let Some(text) = store.backend.load(LOGS_COLLECTION)? {
            store.logs = parse_json(&text, "IngestionLog")?;
        }

        tracing::debug!("opened store: {:?}", store);
        Ok(store)
    }

    /// A store over a fresh [`MemoryBackend`].
    pub fn in_memory(at: DateTime<Utc>) -> IngestResult<Self> {
        Self::open(Box::new(MemoryBackend::default()), at)
    }

    /// Insert or merge a patient, returning the stored record.
    ///
    /// A new id is stored at version 1. An existing id is merged with the newer values
    /// winning and its version advances by exactly one; `lastUpdated` becomes `at` either
    /// way.
    pub fn upsert_patient(
        &mut self,
        patient: PatientRecord,
        at: DateTime<Utc>,
    ) -> IngestResult<&PatientRecord> {
        let index = match self.patients.iter().position(|p| p.id == patient.id) {
            Some(index) => {
                let existing = self.patients.remove(index);
                let merged = existing.merged_with(patient, at);
                tracing::debug!("merged patient {} to version {}", merged.id, merged.version());
                self.patients.insert(index, merged);
                index
            }
            None => {
                let mut patient = patient;
                patient.meta = Meta::first(at);
                tracing::debug!("inserted patient {}", patient.id);
                self.patients.push(patient);
                self.patients.len() - 1
            }
        };
        self.save_collection(PATIENTS_COLLECTION)?;
        Ok(&self.patients[index])
    }

    pub fn append_encounter(&mut self, encounter: EncounterRecord) -> IngestResult<()> {
        self.encounters.push(encounter);
        self.save_collection(ENCOUNTERS_COLLECTION)
    }

    /// Append a row's observations with a single write.
    pub fn append_observations(
        &mut self,
        observations: impl IntoIterator<Item = ObservationRecord>,
    ) -> IngestResult<()> {
        self.observations.extend(observations);
        self.save_collection(OBSERVATIONS_COLLECTION)
    }

    pub fn append_log(&mut self, entry: IngestionLogEntry) -> IngestResult<()> {
        self.logs.push(entry);
        self.save_collection(LOGS_COLLECTION)
    }

    /// All patients in insertion order.
    pub fn patients(&self) -> &[PatientRecord] {
        &self.patients
    }

    pub fn patient(&self, id: &str) -> Option<&PatientRecord> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn encounters(&self) -> &[EncounterRecord] {
        &self.encounters
    }

    pub fn observations(&self) -> &[ObservationRecord] {
        &self.observations
    }

    pub fn encounters_for(&self, patient_id: &str, mode: SubjectMatch) -> Vec<&EncounterRecord> {
        self.encounters
            .iter()
            .filter(|e| mode.matches(&e.subject, patient_id))
            .collect()
    }

    pub fn observations_for(
        &self,
        patient_id: &str,
        mode: SubjectMatch,
    ) -> Vec<&ObservationRecord> {
        self.observations
            .iter()
            .filter(|o| mode.matches(&o.subject, patient_id))
            .collect()
    }

    /// A collection bundle of the patient, its encounters and its observations.
    ///
    /// Subjects are matched exactly. `None` if no patient has this id.
    pub fn patient_bundle(&self, patient_id: &str) -> Option<Bundle> {
        let patient = self.patient(patient_id)?.clone();
        Some(Bundle::collection(
            patient,
            self.encounters_for(patient_id, SubjectMatch::Exact)
                .into_iter()
                .cloned(),
            self.observations_for(patient_id, SubjectMatch::Exact)
                .into_iter()
                .cloned(),
        ))
    }

    /// Log entries, newest first. Entries with equal timestamps list the later append
    /// first.
    pub fn logs(&self) -> Vec<&IngestionLogEntry> {
        let mut logs: Vec<&IngestionLogEntry> = self.logs.iter().rev().collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        logs
    }

    /// Count patients per triage level.
    pub fn triage_summary(&self) -> TriageSummary {
        let mut summary = TriageSummary::default();
        for patient in &self.patients {
            match patient.triage_level().map(TriageLevel::parse) {
                Some(Ok(TriageLevel::P1)) => summary.p1 += 1,
                Some(Ok(TriageLevel::P2)) => summary.p2 += 1,
                Some(Ok(TriageLevel::P3)) => summary.p3 += 1,
                Some(Ok(TriageLevel::P4)) => summary.p4 += 1,
                _ => summary.unknown += 1,
            }
        }
        summary
    }

    /// Drop every record and log, leaving only the demo patient.
    pub fn reset(&mut self, at: DateTime<Utc>) -> IngestResult<()> {
        self.patients = vec![demo_patient(at)];
        self.encounters.clear();
        self.observations.clear();
        self.logs.clear();
        for collection in COLLECTIONS {
            self.save_collection(collection)?;
        }
        tracing::info!("store reset to demo state");
        Ok(())
    }

    fn save_collection(&mut self, collection: &str) -> IngestResult<()> {
        let text = match collection {
            PATIENTS_COLLECTION => render_json(&self.patients)?,
            ENCOUNTERS_COLLECTION => render_json(&self.encounters)?,
            OBSERVATIONS_COLLECTION => render_json(&self.observations)?,
            LOGS_COLLECTION => render_json(&self.logs)?,
            other => {
                return Err(IngestError::InvalidInput(format!(
                    "unknown collection '{other}'"
                )))
            }
        };
        self.backend.save(collection, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{LogSource, LogStatus};
    use chrono::{Duration, TimeZone};
    use fhir::{
        CodeableConcept, Coding, EncounterStatus, ObservationStatus, Period, Quantity, TextValue,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn patient(id: &str, triage: &str) -> PatientRecord {
        PatientRecord {
            resource_type: "Patient".into(),
            id: id.into(),
            active: true,
            name: vec![HumanName {
                use_type: None,
                family: "Doe".into(),
                given: vec!["Jane".into()],
            }],
            telecom: vec![],
            gender: Gender::Female,
            birth_date: "1990-05-01".into(),
            identifier: vec![],
            extension: vec![Extension {
                url: TRIAGE_EXTENSION_URL.into(),
                value_string: Some(triage.into()),
            }],
            meta: Meta::first(t0()),
        }
    }

    fn encounter(id: &str, subject: &str) -> EncounterRecord {
        EncounterRecord {
            resource_type: "Encounter".into(),
            id: id.into(),
            status: EncounterStatus::Arrived,
            class: Coding {
                system: "actCode".into(),
                code: "EMER".into(),
                display: "Emergency".into(),
            },
            subject: Reference {
                reference: subject.into(),
            },
            period: Some(Period {
                start: t0(),
                end: None,
            }),
            reason_code: vec![TextValue {
                text: "Fever".into(),
            }],
        }
    }

    fn observation(id: &str, patient_id: &str, value: f64) -> ObservationRecord {
        ObservationRecord {
            resource_type: "Observation".into(),
            id: id.into(),
            status: ObservationStatus::Final,
            code: CodeableConcept {
                coding: vec![Coding {
                    system: "LOINC".into(),
                    code: "8867-4".into(),
                    display: "Heart Rate".into(),
                }],
                text: Some("Heart Rate".into()),
            },
            subject: Reference::patient(patient_id),
            effective_date_time: t0(),
            value_quantity: Some(Quantity::ucum(value, "bpm")),
        }
    }

    fn log_at(id: &str, at: DateTime<Utc>) -> IngestionLogEntry {
        IngestionLogEntry {
            id: id.into(),
            timestamp: at,
            source: LogSource::GoogleForms,
            status: LogStatus::Success,
            raw_snippet: "MSH|".into(),
            patient_reference: None,
        }
    }

    #[test]
    fn fresh_store_holds_only_demo_patient() {
        let store = RecordStore::in_memory(t0()).unwrap();
        assert_eq!(store.patients().len(), 1);
        let demo = store.patient(DEMO_PATIENT_ID).unwrap();
        assert_eq!(demo.version(), 1);
        assert_eq!(demo.gender, Gender::Other);
        assert_eq!(demo.triage_level(), Some("P4"));
        assert!(store.encounters().is_empty());
        assert!(store.logs().is_empty());
    }

    #[test]
    fn upsert_inserts_at_version_one() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        let mut incoming = patient("p-1", "P2");
        incoming.meta.version_id = 9;
        let stored = store.upsert_patient(incoming, t0()).unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(store.patients().len(), 2);
    }

    #[test]
    fn identical_upserts_only_advance_version() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        store.upsert_patient(patient("p-1", "P2"), t0()).unwrap();
        let later = t0() + Duration::minutes(5);
        store.upsert_patient(patient("p-1", "P2"), later).unwrap();
        store.upsert_patient(patient("p-1", "P2"), later).unwrap();

        let stored = store.patient("p-1").unwrap();
        assert_eq!(stored.version(), 3);
        assert_eq!(stored.meta.last_updated, later);
        let mut expected = patient("p-1", "P2");
        expected.meta = stored.meta.clone();
        assert_eq!(stored, &expected);
    }

    #[test]
    fn upsert_merges_newer_values() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        store.upsert_patient(patient("p-1", "P4"), t0()).unwrap();
        let mut newer = patient("p-1", "P1");
        newer.birth_date = String::new();
        store.upsert_patient(newer, t0()).unwrap();

        let stored = store.patient("p-1").unwrap();
        assert_eq!(stored.triage_level(), Some("P1"));
        assert_eq!(stored.birth_date, "");
        assert_eq!(stored.version(), 2);
    }

    #[test]
    fn upsert_without_contact_drops_stored_telecom() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        let mut first = patient("p-9", "P3");
        first.telecom = vec![ContactPoint {
            system: ContactSystem::Email,
            value: "old@example.com".into(),
        }];
        store.upsert_patient(first, t0()).unwrap();

        let stored = store.upsert_patient(patient("p-9", "P3"), t0()).unwrap();
        assert!(stored.telecom.is_empty());
        assert_eq!(stored.version(), 2);
    }

    #[test]
    fn patient_bundle_collects_linked_records() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        store.upsert_patient(patient("p-1", "P2"), t0()).unwrap();
        store.append_encounter(encounter("e-1", "Patient/p-1")).unwrap();
        store.append_encounter(encounter("e-2", "Patient/p-12")).unwrap();
        store
            .append_observations(vec![observation("o-1", "p-1", 80.0), observation("o-2", "p-2", 90.0)])
            .unwrap();

        let bundle = store.patient_bundle("p-1").unwrap();
        assert_eq!(bundle.resource_type, "Bundle");
        assert_eq!(bundle.bundle_type, "collection");
        let ids: Vec<_> = bundle.entry.iter().map(|e| e.resource.id()).collect();
        assert_eq!(ids, vec!["p-1", "e-1", "o-1"]);

        assert!(store.patient_bundle("p-404").is_none());
    }

    #[test]
    fn subject_lookup_is_exact_by_default() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        store.append_encounter(encounter("e-1", "Patient/p-1")).unwrap();
        store.append_encounter(encounter("e-2", "Patient/p-12")).unwrap();
        store.append_encounter(encounter("e-3", "p-1")).unwrap();

        let exact: Vec<_> = store
            .encounters_for("p-1", SubjectMatch::default())
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(exact, vec!["e-1", "e-3"]);

        let loose = store.encounters_for("p-1", SubjectMatch::Contains);
        assert_eq!(loose.len(), 3);
    }

    #[test]
    fn observations_filter_by_subject() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        store
            .append_observations(vec![observation("o-1", "p-1", 80.0), observation("o-2", "p-2", 90.0)])
            .unwrap();
        store.append_observations([observation("o-3", "p-1", 85.0)]).unwrap();
        let found = store.observations_for("p-1", SubjectMatch::Exact);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].id, "o-3");
    }

    #[test]
    fn logs_are_newest_first() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        store.append_log(log_at("a", t0())).unwrap();
        store.append_log(log_at("b", t0() + Duration::seconds(10))).unwrap();
        store.append_log(log_at("c", t0() + Duration::seconds(5))).unwrap();
        store.append_log(log_at("d", t0() + Duration::seconds(10))).unwrap();

        let ids: Vec<_> = store.logs().into_iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn triage_summary_counts_levels() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        store.upsert_patient(patient("p-1", "P1"), t0()).unwrap();
        store.upsert_patient(patient("p-2", "p1"), t0()).unwrap();
        store.upsert_patient(patient("p-3", "P3"), t0()).unwrap();
        store.upsert_patient(patient("p-4", "urgent"), t0()).unwrap();

        let summary = store.triage_summary();
        assert_eq!(summary.p1, 2);
        assert_eq!(summary.p2, 0);
        assert_eq!(summary.p3, 1);
        assert_eq!(summary.p4, 1);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn reset_restores_demo_state() {
        let mut store = RecordStore::in_memory(t0()).unwrap();
        store.upsert_patient(patient("p-1", "P1"), t0()).unwrap();
        store.append_encounter(encounter("e-1", "Patient/p-1")).unwrap();
        store.append_log(log_at("a", t0())).unwrap();

        store.reset(t0()).unwrap();
        assert_eq!(store.patients().len(), 1);
        assert!(store.patient(DEMO_PATIENT_ID).is_some());
        assert!(store.encounters().is_empty());
        assert!(store.logs().is_empty());
    }

    #[test]
    fn directory_backend_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = JsonDirBackend::new(dir.path()).unwrap();
            let mut store = RecordStore::open(Box::new(backend), t0()).unwrap();
            store.upsert_patient(patient("p-1", "P2"), t0()).unwrap();
            store.append_encounter(encounter("e-1", "Patient/p-1")).unwrap();
            store.append_observations([observation("o-1", "p-1", f64::NAN)]).unwrap();
            store.append_log(log_at("a", t0())).unwrap();
        }

        let backend = JsonDirBackend::new(dir.path()).unwrap();
        let store = RecordStore::open(Box::new(backend), t0()).unwrap();
        assert_eq!(store.patients().len(), 2);
        assert_eq!(store.patient("p-1").unwrap().triage_level(), Some("P2"));
        assert_eq!(store.encounters().len(), 1);
        assert_eq!(store.logs().len(), 1);
        let value = store.observations()[0].value_quantity.as_ref().unwrap().value;
        assert!(value.is_nan());
        assert!(!dir.path().join(".patients.json.tmp").exists());
    }

    #[test]
    fn corrupt_collection_reports_failing_path() {
        let mut backend = MemoryBackend::default();
        backend
            .save(PATIENTS_COLLECTION, r#"[{"resourceType":"Patient","id":7}]"#)
            .unwrap();
        let err = RecordStore::open(Box::new(backend), t0()).unwrap_err();
        match err {
            IngestError::Serialization(fhir::FhirError::Translation(msg)) => {
                assert!(msg.contains("[0].id"), "{msg}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_patient_list_is_not_reseeded() {
        let mut backend = MemoryBackend::default();
        backend.save(PATIENTS_COLLECTION, "[]").unwrap();
        let store = RecordStore::open(Box::new(backend), t0()).unwrap();
        assert!(store.patients().is_empty());
    }
}
