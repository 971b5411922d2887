//! Wire message → FHIR-aligned records.

use crate::layout::{self, dg1, obx, pid, pv1};
use crate::message::{Segment, WireMessage};
use crate::{Hl7Error, Hl7Result};
use aether_ids::IdGenerator;
use chrono::{DateTime, NaiveDateTime, Utc};
use fhir::{
    CodeableConcept, Coding, ContactPoint, ContactSystem, EncounterRecord, EncounterStatus,
    Extension, Gender, HumanName, Identifier, Meta, ObservationRecord, ObservationStatus, Period,
    PatientRecord, Quantity, Reference, Resource, TextValue, TRIAGE_EXTENSION_URL,
};

/// Prefix that turns a numeric record number into a patient id.
pub const PATIENT_ID_PREFIX: &str = "p-";
/// Birth date used when `PID-7` is not an 8-digit date.
pub const FALLBACK_BIRTH_DATE: &str = "1990-01-01";
/// Triage level used when `PV1` or `PV1-19` is absent.
pub const DEFAULT_TRIAGE_LEVEL: &str = "P4";
/// Encounter reason used when `DG1` is absent or empty.
pub const DEFAULT_REASON: &str = "Checkup";
/// Identifier system for medical record numbers.
pub const MRN_SYSTEM: &str = "urn:mrn";

/// The records reconstructed from one message.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMessage {
    pub patient: PatientRecord,
    pub encounter: EncounterRecord,
    pub observations: Vec<ObservationRecord>,
}

/// Rebuilds records from messages produced by [`crate::MessageEncoder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageDecoder;

impl MessageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Parse then decode message text.
    pub fn decode_text(&self, text: &str, ids: &mut IdGenerator) -> Hl7Result<DecodedMessage> {
        self.decode(&WireMessage::parse(text)?, ids)
    }

    /// Decode a parsed message.
    ///
    /// # Errors
    ///
    /// - [`Hl7Error::MissingSegment`] if there is no `PID` segment
    /// - [`Hl7Error::DuplicateSegment`] if there is more than one `PID` segment
    /// - [`Hl7Error::MissingField`] if `PID-3` carries no identifier
    ///
    /// Malformed dates and observation values never fail the decode; they fall back to
    /// defaults (fixed birth date, NaN value).
    pub fn decode(&self, message: &WireMessage, ids: &mut IdGenerator) -> Hl7Result<DecodedMessage> {
        let pid = match message.count(pid::TAG) {
            0 => return Err(Hl7Error::MissingSegment(pid::TAG)),
            1 => message
                .find(pid::TAG)
                .ok_or(Hl7Error::MissingSegment(pid::TAG))?,
            n => return Err(Hl7Error::DuplicateSegment(pid::TAG, n)),
        };
        let pv1 = message.find(pv1::TAG);
        let dg1 = message.find(dg1::TAG);

        let raw_id = pid.component(pid::IDENTIFIER, pid::IDENTIFIER_VALUE);
        let raw_id = raw_id.trim();
        if raw_id.is_empty() {
            return Err(Hl7Error::MissingField("PID-3"));
        }
        let patient_id = canonical_patient_id(raw_id);
        let now = ids.now();

        let triage = pv1
            .map(|s| s.value(pv1::TRIAGE_LEVEL))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TRIAGE_LEVEL.to_owned());

        let patient = PatientRecord {
            resource_type: PatientRecord::RESOURCE_TYPE.to_owned(),
            id: patient_id.clone(),
            active: true,
            name: vec![decode_name(pid)],
            telecom: decode_telecom(pid),
            gender: gender_from_sex_code(&pid.value(pid::SEX)),
            birth_date: reformat_birth_date(&pid.value(pid::BIRTH_DATE)),
            identifier: vec![Identifier {
                system: MRN_SYSTEM.to_owned(),
                value: raw_id.to_owned(),
            }],
            extension: vec![Extension {
                url: TRIAGE_EXTENSION_URL.to_owned(),
                value_string: Some(triage),
            }],
            meta: Meta::first(now),
        };

        let encountered_at = pv1
            .and_then(|s| parse_timestamp(&s.value(pv1::ENCOUNTER_TIMESTAMP)))
            .unwrap_or(now);

        let encounter = EncounterRecord {
            resource_type: EncounterRecord::RESOURCE_TYPE.to_owned(),
            id: ids.encounter_id(),
            status: EncounterStatus::Arrived,
            class: Coding {
                system: "actCode".into(),
                code: "EMER".into(),
                display: "Emergency".into(),
            },
            subject: Reference::patient(&patient_id),
            period: Some(Period {
                start: encountered_at,
                end: None,
            }),
            reason_code: vec![TextValue {
                text: dg1.map(decode_reason).unwrap_or_else(|| DEFAULT_REASON.to_owned()),
            }],
        };

        let observations = message
            .all(obx::TAG)
            .enumerate()
            .map(|(index, seg)| decode_observation(seg, index, &patient_id, encountered_at, ids))
            .collect();

        Ok(DecodedMessage {
            patient,
            encounter,
            observations,
        })
    }
}

/// Canonicalise a raw record number into a patient id.
///
/// Purely numeric ids gain the `p-` prefix; anything already prefixed or non-numeric is
/// used verbatim, so ids are never double-prefixed.
pub fn canonical_patient_id(raw: &str) -> String {
    let numeric = !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit());
    if numeric && !raw.starts_with(PATIENT_ID_PREFIX) {
        format!("{PATIENT_ID_PREFIX}{raw}")
    } else {
        raw.to_owned()
    }
}

/// `YYYYMMDD` → `YYYY-MM-DD`; anything that is not exactly 8 digits yields
/// [`FALLBACK_BIRTH_DATE`].
pub fn reformat_birth_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
    } else {
        tracing::debug!("birth date '{}' is not YYYYMMDD, using fallback", raw);
        FALLBACK_BIRTH_DATE.to_owned()
    }
}

/// `M` is male; every other code, including `F`, `O`, `U` and empty, is female.
pub fn gender_from_sex_code(code: &str) -> Gender {
    if code.trim() == "M" {
        Gender::Male
    } else {
        Gender::Female
    }
}

fn decode_name(pid: &Segment) -> HumanName {
    let given = pid.component(pid::NAME, pid::NAME_GIVEN);
    HumanName {
        use_type: None,
        family: pid.component(pid::NAME, pid::NAME_FAMILY),
        given: if given.is_empty() { vec![] } else { vec![given] },
    }
}

fn decode_telecom(pid: &Segment) -> Vec<ContactPoint> {
    [
        (ContactSystem::Email, pid::CONTACT_EMAIL),
        (ContactSystem::Phone, pid::CONTACT_PHONE),
    ]
    .into_iter()
    .filter_map(|(system, component)| {
        let value = pid.component(pid::CONTACT, component);
        (!value.trim().is_empty()).then(|| ContactPoint { system, value })
    })
    .collect()
}

fn decode_reason(dg1: &Segment) -> String {
    let text = dg1.component(dg1::DIAGNOSIS, dg1::DIAGNOSIS_TEXT);
    if !text.trim().is_empty() {
        return text;
    }
    let code = dg1.component(dg1::DIAGNOSIS, 0);
    if !code.trim().is_empty() {
        return code;
    }
    DEFAULT_REASON.to_owned()
}

fn decode_observation(
    seg: &Segment,
    index: usize,
    patient_id: &str,
    effective: DateTime<Utc>,
    ids: &mut IdGenerator,
) -> ObservationRecord {
    let code = seg.component(obx::IDENTIFIER, obx::IDENTIFIER_CODE);
    let display = seg.component(obx::IDENTIFIER, obx::IDENTIFIER_DISPLAY);
    let system = match seg.component(obx::IDENTIFIER, obx::IDENTIFIER_SYSTEM).as_str() {
        "LN" | "" => "LOINC".to_owned(),
        other => other.to_owned(),
    };
    let raw_value = seg.value(obx::VALUE);
    let value = raw_value.trim().parse::<f64>().unwrap_or_else(|_| {
        tracing::debug!("observation value '{}' is not numeric", raw_value);
        f64::NAN
    });
    let unit = seg.value(obx::UNITS);
    let status = if seg.value(obx::RESULT_STATUS) == obx::RESULT_STATUS_FINAL {
        ObservationStatus::Final
    } else {
        ObservationStatus::Preliminary
    };

    ObservationRecord {
        resource_type: ObservationRecord::RESOURCE_TYPE.to_owned(),
        id: ids.observation_id(index),
        status,
        code: CodeableConcept {
            coding: vec![Coding {
                system,
                code,
                display: display.clone(),
            }],
            text: Some(display),
        },
        subject: Reference::patient(patient_id),
        effective_date_time: effective,
        value_quantity: Some(Quantity::ucum(value, &unit)),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), layout::TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}
