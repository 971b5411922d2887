use hl7::Hl7Error;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("could not find a name or id column; detected headers: {}", .headers.join(", "))]
    SchemaInference { headers: Vec<String> },
    #[error("line {line}: {reason}")]
    RowParse { line: usize, reason: String },
    #[error("message has no {0} segment")]
    MissingSegment(&'static str),
    #[error("failed to fetch source: {0}")]
    SourceFetch(String),
    #[error("source appears empty; it needs a header and at least one response")]
    EmptySource,
    #[error("storage failure on {collection}: {source}")]
    Storage {
        collection: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to (de)serialise records: {0}")]
    Serialization(#[from] fhir::FhirError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl IngestError {
    /// Failures that abort the whole batch rather than a single row.
    pub fn is_batch_level(&self) -> bool {
        !matches!(
            self,
            IngestError::RowParse { .. } | IngestError::MissingSegment(_)
        )
    }

    /// Attach a source line to a decode failure.
    pub(crate) fn from_decode(err: Hl7Error, line: usize) -> Self {
        match err {
            Hl7Error::MissingSegment(tag) => IngestError::MissingSegment(tag),
            other => IngestError::RowParse {
                line,
                reason: other.to_string(),
            },
        }
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
