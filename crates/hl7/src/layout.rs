//! Segment layout table: the positional contract shared by encoder and decoder.
//!
//! Field indices count the segment tag as field 0, so `PID-3` is index 3 of the
//! `|`-split line. For `MSH` the field separator itself is field 1 in HL7 numbering; this
//! table uses split positions, where the encoding characters land at index 1.
//!
//! Component indices are zero-based positions within a `^`-split field.
//!
//! # Important
//!
//! [`crate::encode`] and [`crate::decode`] must only address fields through these
//! constants. Changing an index changes the wire format.

/// Separates segment lines.
pub const SEGMENT_SEPARATOR: char = '\r';
/// Separates fields within a segment.
pub const FIELD_SEPARATOR: char = '|';
/// Separates components within a field.
pub const COMPONENT_SEPARATOR: char = '^';
/// Separates repetitions within a field.
pub const REPETITION_SEPARATOR: char = '~';
/// Introduces escape sequences.
pub const ESCAPE_CHARACTER: char = '\\';
/// Separates sub-components within a component.
pub const SUBCOMPONENT_SEPARATOR: char = '&';
/// Literal value of `MSH-2`.
pub const ENCODING_CHARACTERS: &str = "^~\\&";

/// Message header.
pub mod msh {
    pub const TAG: &str = "MSH";
    pub const ENCODING_CHARACTERS: usize = 1;
    pub const SENDING_APPLICATION: usize = 2;
    pub const SENDING_FACILITY: usize = 3;
    pub const RECEIVING_APPLICATION: usize = 4;
    pub const RECEIVING_FACILITY: usize = 5;
    /// `YYYYMMDDHHMMSS`, the encoding instant.
    pub const TIMESTAMP: usize = 6;
    pub const MESSAGE_TYPE: usize = 8;
    pub const CONTROL_ID: usize = 9;
    pub const PROCESSING_ID: usize = 10;
    pub const VERSION: usize = 11;

    pub const MESSAGE_TYPE_VALUE: [&str; 2] = ["ADT", "A01"];
    pub const PROCESSING_ID_VALUE: &str = "P";
    pub const VERSION_VALUE: &str = "2.5";
}

/// Patient identification.
pub mod pid {
    pub const TAG: &str = "PID";
    pub const SET_ID: usize = 1;
    /// `id^^^MRN`
    pub const IDENTIFIER: usize = 3;
    pub const IDENTIFIER_VALUE: usize = 0;
    pub const IDENTIFIER_TYPE: usize = 3;
    pub const IDENTIFIER_TYPE_VALUE: &str = "MRN";
    /// `family^given`
    pub const NAME: usize = 5;
    pub const NAME_FAMILY: usize = 0;
    pub const NAME_GIVEN: usize = 1;
    /// `YYYYMMDD`
    pub const BIRTH_DATE: usize = 7;
    /// Single-character sex code.
    pub const SEX: usize = 8;
    /// `^^^email^^CP^^phone`
    pub const CONTACT: usize = 13;
    pub const CONTACT_EMAIL: usize = 3;
    pub const CONTACT_EQUIPMENT: usize = 5;
    pub const CONTACT_EQUIPMENT_VALUE: &str = "CP";
    pub const CONTACT_PHONE: usize = 7;
}

/// Patient visit.
pub mod pv1 {
    pub const TAG: &str = "PV1";
    pub const SET_ID: usize = 1;
    pub const PATIENT_CLASS: usize = 2;
    pub const PATIENT_CLASS_VALUE: &str = "E";
    pub const LOCATION: usize = 3;
    pub const LOCATION_VALUE: &str = "TRIAGE";
    pub const TRIAGE_LEVEL: usize = 19;
    /// `YYYYMMDDHHMMSS`, the encounter instant.
    pub const ENCOUNTER_TIMESTAMP: usize = 44;
}

/// Observation result.
pub mod obx {
    pub const TAG: &str = "OBX";
    pub const SET_ID: usize = 1;
    pub const VALUE_TYPE: usize = 2;
    pub const VALUE_TYPE_NUMERIC: &str = "NM";
    /// `code^display^system`
    pub const IDENTIFIER: usize = 3;
    pub const IDENTIFIER_CODE: usize = 0;
    pub const IDENTIFIER_DISPLAY: usize = 1;
    pub const IDENTIFIER_SYSTEM: usize = 2;
    pub const VALUE: usize = 5;
    pub const UNITS: usize = 6;
    pub const RESULT_STATUS: usize = 11;
    pub const RESULT_STATUS_FINAL: &str = "F";
}

/// Diagnosis.
pub mod dg1 {
    pub const TAG: &str = "DG1";
    pub const SET_ID: usize = 1;
    /// `^free text`
    pub const DIAGNOSIS: usize = 3;
    pub const DIAGNOSIS_TEXT: usize = 1;
    pub const DIAGNOSIS_TYPE: usize = 6;
    pub const DIAGNOSIS_TYPE_ADMITTING: &str = "A";
}

/// A vital sign the encoder can emit as an OBX segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VitalSign {
    pub code: &'static str,
    pub display: &'static str,
    pub system: &'static str,
    pub unit: &'static str,
}

pub const HEART_RATE: VitalSign = VitalSign {
    code: "8867-4",
    display: "Heart Rate",
    system: "LN",
    unit: "bpm",
};

pub const BODY_TEMPERATURE: VitalSign = VitalSign {
    code: "8310-5",
    display: "Body Temp",
    system: "LN",
    unit: "Cel",
};

/// Date-time format used in `MSH-7` and `PV1-44`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
