//! Header-driven column detection.
//!
//! Form exports name their columns after the questions asked ("What is your name?",
//! "Patient MRN", ...). [`SchemaDetector`] maps each canonical field onto a column by
//! keyword containment, using the ordered [`KEYWORD_TABLE`].

use crate::extract::split_row;
use crate::{IngestError, IngestResult};
use serde::Serialize;
use std::fmt;

/// The fields a form row is normalised into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Timestamp,
    Email,
    Name,
    Id,
    Dob,
    Phone,
    Symptoms,
    Triage,
    HeartRate,
    Temp,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 10] = [
        CanonicalField::Timestamp,
        CanonicalField::Email,
        CanonicalField::Name,
        CanonicalField::Id,
        CanonicalField::Dob,
        CanonicalField::Phone,
        CanonicalField::Symptoms,
        CanonicalField::Triage,
        CanonicalField::HeartRate,
        CanonicalField::Temp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Timestamp => "timestamp",
            CanonicalField::Email => "email",
            CanonicalField::Name => "name",
            CanonicalField::Id => "id",
            CanonicalField::Dob => "dob",
            CanonicalField::Phone => "phone",
            CanonicalField::Symptoms => "symptoms",
            CanonicalField::Triage => "triage",
            CanonicalField::HeartRate => "heartRate",
            CanonicalField::Temp => "temp",
        }
    }

    /// Keywords for this field, in match order.
    pub fn keywords(&self) -> &'static [&'static str] {
        KEYWORD_TABLE[*self as usize].1
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword table, one row per field in [`CanonicalField::ALL`] order.
///
/// A header matches a field when its lower-cased text contains any of the field's
/// keywords. Keywords are lower-case.
pub const KEYWORD_TABLE: [(CanonicalField, &[&str]); 10] = [
    (CanonicalField::Timestamp, &["timestamp", "date", "time"]),
    (CanonicalField::Email, &["email", "address", "mail"]),
    (CanonicalField::Name, &["name", "patient", "full", "subject"]),
    (CanonicalField::Id, &["id", "mrn", "identifier", "record", "number"]),
    (CanonicalField::Dob, &["dob", "birth", "born"]),
    (CanonicalField::Phone, &["phone", "contact", "mobile", "cell"]),
    (
        CanonicalField::Symptoms,
        &["symptom", "reason", "complaint", "issue", "diagnosis", "problem"],
    ),
    (
        CanonicalField::Triage,
        &["triage", "level", "priority", "p1", "p2", "status"],
    ),
    (CanonicalField::HeartRate, &["heart", "rate", "pulse", "bpm", "hr"]),
    (CanonicalField::Temp, &["temp", "fever", "celsius", "fahrenheit"]),
];

/// Canonical field → column index. `None` means unresolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: [Option<usize>; 10],
    width: usize,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.columns[field as usize]
    }

    /// Number of header columns the map was built from.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_resolved(&self, field: CanonicalField) -> bool {
        self.get(field).is_some()
    }

    /// Resolved fields with their column, in [`CanonicalField::ALL`] order.
    pub fn resolved(&self) -> impl Iterator<Item = (CanonicalField, usize)> + '_ {
        CanonicalField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|col| (field, col)))
    }
}

/// Infers a [`ColumnMap`] from a header row.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemaDetector;

impl SchemaDetector {
    pub fn new() -> Self {
        Self
    }

    /// Map headers onto canonical fields.
    ///
    /// Headers are trimmed and stripped of wrapping quotes before matching. For each field
    /// the first header, in column order, containing one of its keywords wins; fields are
    /// matched independently, so one column may serve several fields.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::SchemaInference` if neither a name nor an id column is found.
    pub fn detect<S: AsRef<str>>(&self, headers: &[S]) -> IngestResult<ColumnMap> {
        let normalised: Vec<String> = headers
            .iter()
            .map(|h| strip_wrapping_quotes(h.as_ref()).to_lowercase())
            .collect();

        let mut map = ColumnMap {
            width: normalised.len(),
            ..ColumnMap::default()
        };
        for (field, keywords) in KEYWORD_TABLE {
            map.columns[field as usize] = normalised
                .iter()
                .position(|header| keywords.iter().any(|k| header.contains(k)));
        }

        if !map.is_resolved(CanonicalField::Name) && !map.is_resolved(CanonicalField::Id) {
            return Err(IngestError::SchemaInference {
                headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            });
        }

        tracing::debug!(
            "detected columns: {}",
            map.resolved()
                .map(|(field, col)| format!("{field}={col}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(map)
    }

    /// Split a raw header line and detect columns from it.
    pub fn detect_line(&self, line: &str) -> IngestResult<ColumnMap> {
        let headers = split_row(line, 1)?;
        self.detect(&headers)
    }
}

fn strip_wrapping_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.trim()
}
