//! Input validation utilities.
//!
//! Identifiers configured at startup end up inside wire message headers, where a stray
//! delimiter would shift every following field.

use crate::{IngestError, IngestResult};

/// Characters that carry structure in a wire message.
pub const WIRE_DELIMITERS: &[char] = &['|', '^', '~', '\\', '&', '\r', '\n'];

/// Validates that a header identifier is safe to write unescaped into a message header.
///
/// Rejects empty or whitespace-only values, values longer than 180 characters, and values
/// containing a wire delimiter.
///
/// # Errors
///
/// Returns an `IngestError::InvalidInput` naming `label` if the value is invalid.
pub fn validate_wire_identifier(label: &str, value: &str) -> IngestResult<()> {
    const MAX_IDENTIFIER_LEN: usize = 180;

    if value.trim().is_empty() {
        return Err(IngestError::InvalidInput(format!("{label} cannot be empty")));
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(IngestError::InvalidInput(format!(
            "{label} exceeds maximum length of {MAX_IDENTIFIER_LEN} characters"
        )));
    }

    if let Some(c) = value.chars().find(|c| WIRE_DELIMITERS.contains(c)) {
        return Err(IngestError::InvalidInput(format!(
            "{label} contains the wire delimiter {c:?}"
        )));
    }

    Ok(())
}
