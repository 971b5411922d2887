//! Where batch text comes from.
//!
//! Fetching is the only external call in a batch. The HTTP fetch of a published sheet
//! lives with the caller; this module supplies file and in-memory sources plus the URL
//! rewrite such a caller needs.

use crate::{IngestError, IngestResult};
use std::fs;
use std::path::PathBuf;

/// Produces the raw comma-separated text of one batch.
pub trait SourceFetcher {
    fn fetch(&self) -> IngestResult<String>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// A CSV file on local disk.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceFetcher for FileSource {
    fn fetch(&self) -> IngestResult<String> {
        fs::read_to_string(&self.path)
            .map_err(|e| IngestError::SourceFetch(format!("{}: {e}", self.path.display())))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Text already in memory, such as a request body.
#[derive(Clone, Debug)]
pub struct StaticSource {
    text: String,
}

impl StaticSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl SourceFetcher for StaticSource {
    fn fetch(&self) -> IngestResult<String> {
        Ok(self.text.clone())
    }

    fn describe(&self) -> String {
        format!("inline text ({} bytes)", self.text.len())
    }
}

/// Rewrite a sheet edit link into its CSV export link.
///
/// Everything from `/edit` onwards is replaced with `/export?format=csv`; other URLs are
/// returned unchanged.
pub fn normalize_sheet_url(url: &str) -> String {
    match url.find("/edit") {
        Some(at) => format!("{}/export?format=csv", &url[..at]),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn edit_links_become_export_links() {
        assert_eq!(
            normalize_sheet_url("https://docs.google.com/spreadsheets/d/abc/edit#gid=0"),
            "https://docs.google.com/spreadsheets/d/abc/export?format=csv"
        );
        let published = "https://docs.google.com/spreadsheets/d/e/xyz/pub?output=csv";
        assert_eq!(normalize_sheet_url(published), published);
    }

    #[test]
    fn file_source_reads_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Name\nJane").unwrap();
        let source = FileSource::new(file.path());
        assert_eq!(source.fetch().unwrap(), "Name\nJane");
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("absent.csv"));
        assert!(matches!(source.fetch(), Err(IngestError::SourceFetch(_))));
    }

    #[test]
    fn static_source_returns_its_text() {
        let source = StaticSource::new("Name\nJane");
        assert_eq!(source.fetch().unwrap(), "Name\nJane");
        assert!(source.describe().contains("9 bytes"));
    }
}
