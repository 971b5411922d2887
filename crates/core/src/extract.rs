//! Raw row → [`FormRow`].

use crate::constants::{DEFAULT_DOB, DEFAULT_FULL_NAME, DEFAULT_SYMPTOMS, DEFAULT_TRIAGE_LEVEL};
use crate::schema::{CanonicalField, ColumnMap};
use crate::{IngestError, IngestResult};
use chrono::{DateTime, SecondsFormat, Utc};
use hl7::FormRow;

/// Split one comma-separated line into trimmed cells.
///
/// A double quote opening a cell starts a quoted section: commas inside it do not split,
/// `""` inside it yields a literal quote, and the enclosing quotes are dropped. Quotes
/// anywhere else are ordinary text. `line` is the 1-based source line, used only for error
/// reporting.
///
/// # Errors
///
/// Returns `IngestError::RowParse` if a quoted section is never closed.
pub fn split_row(line: &str, line_no: usize) -> IngestResult<Vec<String>> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut cell_start = true;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
            continue;
        }
        match c {
            ',' => {
                cells.push(current.trim().to_string());
                current.clear();
                cell_start = true;
            }
            '"' if cell_start => {
                in_quotes = true;
                cell_start = false;
            }
            c if c.is_whitespace() => current.push(c),
            _ => {
                current.push(c);
                cell_start = false;
            }
        }
    }

    if in_quotes {
        return Err(IngestError::RowParse {
            line: line_no,
            reason: "unterminated quoted field".into(),
        });
    }
    cells.push(current.trim().to_string());
    Ok(cells)
}

/// Applies a [`ColumnMap`] to raw rows, filling defaults for missing values.
#[derive(Clone, Debug)]
pub struct RowExtractor {
    columns: ColumnMap,
}

impl RowExtractor {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Extract one raw line. Blank lines yield `Ok(None)` and must not be counted.
    ///
    /// `now` stands in for a missing timestamp.
    pub fn extract(
        &self,
        line: &str,
        line_no: usize,
        now: DateTime<Utc>,
    ) -> IngestResult<Option<FormRow>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let cells = split_row(line, line_no)?;
        Ok(Some(self.extract_cells(&cells, now)))
    }

    /// Build a row from already-split cells.
    pub fn extract_cells<S: AsRef<str>>(&self, cells: &[S], now: DateTime<Utc>) -> FormRow {
        let get = |field: CanonicalField| -> Option<String> {
            self.columns
                .get(field)
                .and_then(|col| cells.get(col))
                .map(|cell| cell.as_ref().trim())
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
        };
        let or_default = |field: CanonicalField, default: &str| {
            get(field).unwrap_or_else(|| default.to_string())
        };

        FormRow {
            timestamp: get(CanonicalField::Timestamp)
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            patient_id: get(CanonicalField::Id),
            full_name: or_default(CanonicalField::Name, DEFAULT_FULL_NAME),
            dob: or_default(CanonicalField::Dob, DEFAULT_DOB),
            phone: get(CanonicalField::Phone).unwrap_or_default(),
            email: get(CanonicalField::Email).unwrap_or_default(),
            symptoms: or_default(CanonicalField::Symptoms, DEFAULT_SYMPTOMS),
            triage_level: or_default(CanonicalField::Triage, DEFAULT_TRIAGE_LEVEL),
            heart_rate: get(CanonicalField::HeartRate),
            temp: get(CanonicalField::Temp),
            sex: None,
        }
    }
}
