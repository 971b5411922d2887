//! Shared value types for the intake pipeline.

/// Errors that can occur when parsing a triage level.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// The input was not one of `P1`..`P4`
    #[error("Unknown triage level: '{0}'")]
    Unknown(String),
}

/// Acuity code assigned at triage.
///
/// `P1` is the most urgent and `P4` the least. Form submissions carry the level as free
/// text, so records keep the raw string and callers parse it when they need to bucket
/// patients by acuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriageLevel {
    P1,
    P2,
    P3,
    P4,
}

impl TriageLevel {
    /// Parses a triage level, ignoring case and surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, TriageError> {
        match input.trim().to_ascii_uppercase().as_str() {
            "P1" => Ok(Self::P1),
            "P2" => Ok(Self::P2),
            "P3" => Ok(Self::P3),
            "P4" => Ok(Self::P4),
            _ => Err(TriageError::Unknown(input.to_owned())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
        }
    }
}

impl Default for TriageLevel {
    fn default() -> Self {
        Self::P4
    }
}

impl std::fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriageLevel {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for TriageLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for TriageLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TriageLevel::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triage_parse_is_case_insensitive() {
        assert_eq!(TriageLevel::parse(" p2 ").unwrap(), TriageLevel::P2);
        assert_eq!("P1".parse::<TriageLevel>().unwrap(), TriageLevel::P1);
    }

    #[test]
    fn triage_parse_rejects_unknown_codes() {
        match TriageLevel::parse("urgent") {
            Err(TriageError::Unknown(raw)) => assert_eq!(raw, "urgent"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn triage_orders_most_urgent_first() {
        assert!(TriageLevel::P1 < TriageLevel::P4);
        assert_eq!(TriageLevel::default(), TriageLevel::P4);
    }

    #[test]
    fn triage_serializes_as_code() {
        let json = serde_json::to_string(&TriageLevel::P3).unwrap();
        assert_eq!(json, "\"P3\"");
    }
}
