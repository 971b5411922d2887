//! Segmented wire messages for form intake.
//!
//! A message is a list of segment lines separated by `\r`. Each segment starts with a
//! three-letter tag and carries `|`-delimited fields, some of which hold `^`-delimited
//! components. The subset implemented here follows HL7 v2.5 ADT^A01 closely enough for
//! the pipeline's own encoder and decoder; it is not a general HL7 implementation.
//!
//! The two directions share one positional contract, the [`layout`] table. The encoder
//! writes values at the indices it names and the decoder reads them back from the same
//! indices, so a field can only move if both directions move with it.
//!
//! Flow:
//! - [`MessageEncoder`] turns a [`FormRow`] into a [`WireMessage`]
//! - [`WireMessage::parse`] / [`WireMessage::render`] move between text and segments
//! - [`MessageDecoder`] turns a [`WireMessage`] into FHIR-aligned records

pub mod decode;
pub mod encode;
pub mod form;
pub mod layout;
pub mod message;

pub use decode::{DecodedMessage, MessageDecoder};
pub use encode::{HeaderIdentity, MessageEncoder};
pub use form::{FormRow, Sex};
pub use message::{Segment, WireMessage};

/// Errors raised while parsing or decoding a wire message.
#[derive(Debug, thiserror::Error)]
pub enum Hl7Error {
    #[error("missing {0} segment")]
    MissingSegment(&'static str),

    #[error("expected exactly one {0} segment, found {1}")]
    DuplicateSegment(&'static str, usize),

    #[error("malformed segment at line {line}: {reason}")]
    MalformedSegment { line: usize, reason: String },

    #[error("missing required field {0}")]
    MissingField(&'static str),
}

/// Type alias for Results that can fail with an [`Hl7Error`].
pub type Hl7Result<T> = Result<T, Hl7Error>;
