//! Form row → wire message.

use crate::form::{FormRow, Sex};
use crate::layout::{self, dg1, msh, obx, pid, pv1, VitalSign};
use crate::message::{Segment, WireMessage};
use aether_ids::IdGenerator;

/// Application and facility names written into the message header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderIdentity {
    pub sending_application: String,
    pub sending_facility: String,
    pub receiving_application: String,
    pub receiving_facility: String,
}

impl Default for HeaderIdentity {
    fn default() -> Self {
        Self {
            sending_application: "GOOGLE_FORMS".into(),
            sending_facility: "AETHER".into(),
            receiving_application: "FHIR_PORTAL".into(),
            receiving_facility: "HOSPITAL".into(),
        }
    }
}

/// Serialises form rows into ADT^A01-style messages.
///
/// Encoding is deterministic given the clock and random source inside the
/// [`IdGenerator`]. Random draws happen in a fixed order: message id, then the synthetic
/// record number (only when the row has no id), then the sex coin-flip (only when the row
/// has no sex).
#[derive(Clone, Debug, Default)]
pub struct MessageEncoder {
    header: HeaderIdentity,
}

impl MessageEncoder {
    pub fn new(header: HeaderIdentity) -> Self {
        Self { header }
    }

    pub fn header(&self) -> &HeaderIdentity {
        &self.header
    }

    /// Encode one row. Vitals that are absent or blank produce no OBX segment.
    pub fn encode(&self, row: &FormRow, ids: &mut IdGenerator) -> WireMessage {
        let stamp = ids.now().format(layout::TIMESTAMP_FORMAT).to_string();
        let mut message = WireMessage::new();

        message.push(self.header_segment(&stamp, ids));
        message.push(patient_segment(row, ids));
        message.push(visit_segment(row, &stamp));

        let vitals = [
            (layout::HEART_RATE, row.heart_rate_value()),
            (layout::BODY_TEMPERATURE, row.temperature_value()),
        ];
        let present = vitals
            .into_iter()
            .filter_map(|(vital, value)| value.map(|v| (vital, v)));
        for (set_id, (vital, value)) in (1..).zip(present) {
            message.push(observation_segment(set_id, vital, value));
        }

        message.push(diagnosis_segment(row));
        message
    }

    fn header_segment(&self, stamp: &str, ids: &mut IdGenerator) -> Segment {
        let mut msh = Segment::new(msh::TAG);
        msh.set_raw(msh::ENCODING_CHARACTERS, layout::ENCODING_CHARACTERS);
        msh.set(msh::SENDING_APPLICATION, &self.header.sending_application);
        msh.set(msh::SENDING_FACILITY, &self.header.sending_facility);
        msh.set(msh::RECEIVING_APPLICATION, &self.header.receiving_application);
        msh.set(msh::RECEIVING_FACILITY, &self.header.receiving_facility);
        msh.set(msh::TIMESTAMP, stamp);
        msh.set_components(msh::MESSAGE_TYPE, &msh::MESSAGE_TYPE_VALUE);
        msh.set(msh::CONTROL_ID, &ids.message_id());
        msh.set(msh::PROCESSING_ID, msh::PROCESSING_ID_VALUE);
        msh.set(msh::VERSION, msh::VERSION_VALUE);
        msh
    }
}

fn patient_segment(row: &FormRow, ids: &mut IdGenerator) -> Segment {
    let id = match row.supplied_id() {
        Some(id) => id.to_owned(),
        None => ids.medical_record_number(),
    };
    let (given, family) = row.given_and_family();
    let birth_date: String = row
        .dob
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '/' | '.'))
        .collect();
    let sex = row.sex.unwrap_or_else(|| {
        if ids.coin_flip() {
            Sex::Male
        } else {
            Sex::Female
        }
    });

    let mut identifier = [""; pid::IDENTIFIER_TYPE + 1];
    identifier[pid::IDENTIFIER_VALUE] = id.as_str();
    identifier[pid::IDENTIFIER_TYPE] = pid::IDENTIFIER_TYPE_VALUE;

    let mut name = [""; 2];
    name[pid::NAME_FAMILY] = family;
    name[pid::NAME_GIVEN] = given;

    let mut contact = [""; pid::CONTACT_PHONE + 1];
    contact[pid::CONTACT_EMAIL] = row.email.trim();
    contact[pid::CONTACT_EQUIPMENT] = pid::CONTACT_EQUIPMENT_VALUE;
    contact[pid::CONTACT_PHONE] = row.phone.trim();

    let mut seg = Segment::new(pid::TAG);
    seg.set(pid::SET_ID, "1");
    seg.set_components(pid::IDENTIFIER, &identifier);
    seg.set_components(pid::NAME, &name);
    seg.set(pid::BIRTH_DATE, &birth_date);
    seg.set(pid::SEX, sex.code());
    seg.set_components(pid::CONTACT, &contact);
    seg
}

fn visit_segment(row: &FormRow, stamp: &str) -> Segment {
    let mut seg = Segment::new(pv1::TAG);
    seg.set(pv1::SET_ID, "1");
    seg.set(pv1::PATIENT_CLASS, pv1::PATIENT_CLASS_VALUE);
    seg.set_components(pv1::LOCATION, &[pv1::LOCATION_VALUE, "", "", ""]);
    seg.set(pv1::TRIAGE_LEVEL, row.triage_level.trim());
    seg.set(pv1::ENCOUNTER_TIMESTAMP, stamp);
    seg
}

fn observation_segment(set_id: u32, vital: VitalSign, value: &str) -> Segment {
    let mut identifier = [""; 3];
    identifier[obx::IDENTIFIER_CODE] = vital.code;
    identifier[obx::IDENTIFIER_DISPLAY] = vital.display;
    identifier[obx::IDENTIFIER_SYSTEM] = vital.system;

    let mut seg = Segment::new(obx::TAG);
    seg.set(obx::SET_ID, &set_id.to_string());
    seg.set(obx::VALUE_TYPE, obx::VALUE_TYPE_NUMERIC);
    seg.set_components(obx::IDENTIFIER, &identifier);
    seg.set(obx::VALUE, value);
    seg.set(obx::UNITS, vital.unit);
    seg.set(obx::RESULT_STATUS, obx::RESULT_STATUS_FINAL);
    seg
}

fn diagnosis_segment(row: &FormRow) -> Segment {
    let mut diagnosis = [""; dg1::DIAGNOSIS_TEXT + 1];
    diagnosis[dg1::DIAGNOSIS_TEXT] = row.symptoms.as_str();

    let mut seg = Segment::new(dg1::TAG);
    seg.set(dg1::SET_ID, "1");
    seg.set_components(dg1::DIAGNOSIS, &diagnosis);
    seg.set(dg1::DIAGNOSIS_TYPE, dg1::DIAGNOSIS_TYPE_ADMITTING);
    seg
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_ids::{FixedClock, SequenceRandom};
    use chrono::{TimeZone, Utc};

    fn pinned(values: Vec<u32>) -> IdGenerator {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        IdGenerator::new(
            Box::new(FixedClock::new(at)),
            Box::new(SequenceRandom::new(values)),
        )
    }

    fn jane() -> FormRow {
        FormRow {
            timestamp: "2024-01-01".into(),
            patient_id: Some("1234".into()),
            full_name: "Jane Doe".into(),
            dob: "1990-05-01".into(),
            phone: "555-1234".into(),
            email: "jane@example.com".into(),
            symptoms: "Fever".into(),
            triage_level: "P2".into(),
            heart_rate: None,
            temp: None,
            sex: None,
        }
    }

    #[test]
    fn encodes_exact_message_with_pinned_sources() {
        // message id draw, then coin flip (1 => male)
        let mut ids = pinned(vec![4242, 1]);
        let text = MessageEncoder::default().encode(&jane(), &mut ids).render();
        let lines: Vec<&str> = text.split('\r').collect();

        assert_eq!(
            lines[0],
            "MSH|^~\\&|GOOGLE_FORMS|AETHER|FHIR_PORTAL|HOSPITAL|20240305140709||ADT^A01|MSG4242|P|2.5"
        );
        assert_eq!(
            lines[1],
            "PID|1||1234^^^MRN||Doe^Jane||19900501|M|||||^^^jane@example.com^^CP^^555-1234"
        );
        assert!(lines[2].starts_with("PV1|1|E|TRIAGE^^^|"));
        assert!(lines[2].ends_with("|20240305140709"));
        assert_eq!(lines[2].split('|').nth(pv1::TRIAGE_LEVEL), Some("P2"));
        assert_eq!(lines[3], "DG1|1||^Fever|||A");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn header_timestamp_is_encoding_instant_not_row_timestamp() {
        let mut ids = pinned(vec![1]);
        let mut row = jane();
        row.timestamp = "1999-12-31T23:59:59Z".into();
        let msg = MessageEncoder::default().encode(&row, &mut ids);
        assert_eq!(msg.find("MSH").unwrap().value(msh::TIMESTAMP), "20240305140709");
    }

    #[test]
    fn missing_id_draws_a_record_number() {
        let mut ids = pinned(vec![77, 1234567, 0]);
        let mut row = jane();
        row.patient_id = None;
        let msg = MessageEncoder::default().encode(&row, &mut ids);
        let pid = msg.find("PID").unwrap();
        assert_eq!(pid.component(pid::IDENTIFIER, 0), "4567");
        assert_eq!(pid.value(pid::SEX), "F");
    }

    #[test]
    fn supplied_sex_skips_the_coin_flip() {
        let mut ids = pinned(vec![1]);
        let mut row = jane();
        row.sex = Some(Sex::Female);
        let msg = MessageEncoder::default().encode(&row, &mut ids);
        assert_eq!(msg.find("PID").unwrap().value(pid::SEX), "F");
    }

    #[test]
    fn no_vitals_means_no_obx() {
        let mut ids = pinned(vec![1]);
        let msg = MessageEncoder::default().encode(&jane(), &mut ids);
        assert_eq!(msg.count("OBX"), 0);
    }

    #[test]
    fn heart_rate_only_means_one_obx() {
        let mut ids = pinned(vec![1]);
        let mut row = jane();
        row.heart_rate = Some("88".into());
        row.temp = Some("   ".into());
        let text = MessageEncoder::default().encode(&row, &mut ids).render();
        let obx: Vec<&str> = text.split('\r').filter(|l| l.starts_with("OBX")).collect();
        assert_eq!(obx, ["OBX|1|NM|8867-4^Heart Rate^LN||88|bpm|||||F"]);
    }

    #[test]
    fn both_vitals_mean_two_obx_in_order() {
        let mut ids = pinned(vec![1]);
        let mut row = jane();
        row.heart_rate = Some("88".into());
        row.temp = Some("38.4".into());
        let msg = MessageEncoder::default().encode(&row, &mut ids);
        let obx: Vec<_> = msg.all("OBX").collect();
        assert_eq!(obx.len(), 2);
        assert_eq!(obx[1].raw(obx::SET_ID), "2");
        assert_eq!(obx[1].component(obx::IDENTIFIER, 0), "8310-5");
        assert_eq!(obx[1].value(obx::UNITS), "Cel");
    }

    #[test]
    fn delimiters_in_free_text_are_escaped() {
        let mut ids = pinned(vec![1]);
        let mut row = jane();
        row.symptoms = "pain|nausea^chills".into();
        let text = MessageEncoder::default().encode(&row, &mut ids).render();
        assert!(text.contains("DG1|1||^pain\\F\\nausea\\S\\chills|||A"));
    }

    #[test]
    fn custom_header_identity_is_written() {
        let header = HeaderIdentity {
            sending_application: "KIOSK".into(),
            ..HeaderIdentity::default()
        };
        let mut ids = pinned(vec![1]);
        let msg = MessageEncoder::new(header).encode(&jane(), &mut ids);
        assert_eq!(msg.find("MSH").unwrap().value(msh::SENDING_APPLICATION), "KIOSK");
    }
}
