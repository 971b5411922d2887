//! Segment and message containers plus text parsing/rendering.

use crate::layout::{
    COMPONENT_SEPARATOR, ESCAPE_CHARACTER, FIELD_SEPARATOR, REPETITION_SEPARATOR,
    SEGMENT_SEPARATOR, SUBCOMPONENT_SEPARATOR,
};
use crate::{Hl7Error, Hl7Result};
use std::{fmt, str::FromStr};

/// One segment line. Field 0 is the tag; stored field text is already escaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    fields: Vec<String>,
}

impl Segment {
    pub fn new(tag: &str) -> Self {
        Self {
            fields: vec![tag.to_owned()],
        }
    }

    pub fn tag(&self) -> &str {
        &self.fields[0]
    }

    /// Number of fields including the tag.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.len() <= 1
    }

    /// Store pre-escaped text at `index`, padding intermediate fields with empty values.
    pub fn set_raw(&mut self, index: usize, raw: impl Into<String>) {
        debug_assert!(index > 0, "field 0 is the segment tag");
        if self.fields.len() <= index {
            self.fields.resize(index + 1, String::new());
        }
        self.fields[index] = raw.into();
    }

    /// Store a plain value at `index`, escaping delimiters.
    pub fn set(&mut self, index: usize, value: &str) {
        self.set_raw(index, escape(value));
    }

    /// Store `^`-joined components at `index`, escaping each one.
    pub fn set_components(&mut self, index: usize, components: &[&str]) {
        let joined = components
            .iter()
            .map(|c| escape(c))
            .collect::<Vec<_>>()
            .join(&COMPONENT_SEPARATOR.to_string());
        self.set_raw(index, joined);
    }

    /// Raw (still escaped) field text; empty when the field is absent.
    pub fn raw(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// Whole field value with escapes resolved.
    pub fn value(&self, index: usize) -> String {
        unescape(self.raw(index))
    }

    /// One component of a field with escapes resolved; empty when absent.
    pub fn component(&self, index: usize, component: usize) -> String {
        self.raw(index)
            .split(COMPONENT_SEPARATOR)
            .nth(component)
            .map(unescape)
            .unwrap_or_default()
    }

    fn parse_line(line: &str, line_no: usize) -> Hl7Result<Self> {
        let fields: Vec<String> = line.split(FIELD_SEPARATOR).map(str::to_owned).collect();
        let tag = &fields[0];
        let tag_ok = tag.len() == 3
            && tag
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !tag_ok {
            return Err(Hl7Error::MalformedSegment {
                line: line_no,
                reason: format!("invalid segment tag '{tag}'"),
            });
        }
        Ok(Self { fields })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join(&FIELD_SEPARATOR.to_string()))
    }
}

/// An ordered list of segments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WireMessage {
    segments: Vec<Segment>,
}

impl WireMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First segment with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.tag() == tag)
    }

    /// All segments with the given tag, in message order.
    pub fn all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments.iter().filter(move |s| s.tag() == tag)
    }

    pub fn count(&self, tag: &str) -> usize {
        self.all(tag).count()
    }

    /// Parse message text.
    ///
    /// Segment lines may be separated by CR, LF or CRLF. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Hl7Error::MalformedSegment`] if a line's tag is not three upper-case
    /// alphanumeric characters.
    pub fn parse(text: &str) -> Hl7Result<Self> {
        let mut segments = Vec::new();
        for (idx, line) in text.split(|c| c == '\r' || c == '\n').enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            segments.push(Segment::parse_line(line, idx + 1)?);
        }
        Ok(Self { segments })
    }

    /// Render as text, segments joined by `\r`.
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(Segment::to_string)
            .collect::<Vec<_>>()
            .join(&SEGMENT_SEPARATOR.to_string())
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for WireMessage {
    type Err = Hl7Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WireMessage::parse(s)
    }
}

/// Escape delimiter characters inside a value.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            FIELD_SEPARATOR => out.push_str("\\F\\"),
            COMPONENT_SEPARATOR => out.push_str("\\S\\"),
            REPETITION_SEPARATOR => out.push_str("\\R\\"),
            ESCAPE_CHARACTER => out.push_str("\\E\\"),
            SUBCOMPONENT_SEPARATOR => out.push_str("\\T\\"),
            '\r' => out.push_str("\\X0D\\"),
            '\n' => out.push_str("\\X0A\\"),
            other => out.push(other),
        }
    }
    out
}

/// Resolve escape sequences produced by [`escape`]. Unknown sequences are kept verbatim.
pub fn unescape(value: &str) -> String {
    if !value.contains(ESCAPE_CHARACTER) {
        return value.to_owned();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find(ESCAPE_CHARACTER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find(ESCAPE_CHARACTER) else {
            // unterminated escape
            out.push_str(&rest[start..]);
            return out;
        };
        match &after[..end] {
            "F" => out.push(FIELD_SEPARATOR),
            "S" => out.push(COMPONENT_SEPARATOR),
            "R" => out.push(REPETITION_SEPARATOR),
            "E" => out.push(ESCAPE_CHARACTER),
            "T" => out.push(SUBCOMPONENT_SEPARATOR),
            "X0D" => out.push('\r'),
            "X0A" => out.push('\n'),
            unknown => {
                out.push(ESCAPE_CHARACTER);
                out.push_str(unknown);
                out.push(ESCAPE_CHARACTER);
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
