//! Batch ingestion: raw text → stored records.
//!
//! Per batch the header is analysed once; every following line then travels
//! extract → encode → render → decode → store, and leaves exactly one log entry behind.
//! Blank lines leave nothing.
//!
//! Failure handling:
//! - a row that cannot be parsed or decoded is logged as `Failed` and the batch continues
//! - a batch that cannot start (fetch, empty source, no name/id column) or a store that
//!   cannot be written aborts with a single `Failed` entry and the error is returned

use crate::config::CoreConfig;
use crate::extract::RowExtractor;
use crate::log::{IngestionLogEntry, LogSource};
use crate::schema::SchemaDetector;
use crate::source::SourceFetcher;
use crate::store::RecordStore;
use crate::{IngestError, IngestResult};
use aether_ids::IdGenerator;
use hl7::{MessageDecoder, MessageEncoder, WireMessage};

/// Sequences detection, extraction, encoding, decoding and storage for one batch at a time.
///
/// The store is borrowed mutably for the whole batch, so two batches can never interleave
/// over the same store.
#[derive(Debug)]
pub struct IngestionOrchestrator {
    detector: SchemaDetector,
    encoder: MessageEncoder,
    decoder: MessageDecoder,
    source: LogSource,
    ids: IdGenerator,
}

impl IngestionOrchestrator {
    pub fn new(config: &CoreConfig, ids: IdGenerator) -> Self {
        Self {
            detector: SchemaDetector::new(),
            encoder: config.encoder(),
            decoder: MessageDecoder::new(),
            source: config.source(),
            ids,
        }
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Fetch a batch from `source` and ingest it.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::SourceFetch` if the source cannot be read, plus every error
    /// [`Self::ingest_text`] returns. A `Failed` log entry is written in each case.
    pub fn ingest(
        &mut self,
        store: &mut RecordStore,
        source: &dyn SourceFetcher,
    ) -> IngestResult<usize> {
        tracing::info!("ingesting from {}", source.describe());
        match source.fetch() {
            Ok(text) => self.ingest_text(store, &text),
            Err(err) => Err(self.abort(store, err)),
        }
    }

    /// Ingest raw comma-separated text whose first line is the header.
    ///
    /// Returns the number of rows stored.
    ///
    /// # Errors
    ///
    /// - `IngestError::EmptySource` if the text has fewer than two lines
    /// - `IngestError::SchemaInference` if the header has neither a name nor an id column
    /// - `IngestError::Storage` / `IngestError::Serialization` if the store cannot be written
    pub fn ingest_text(&mut self, store: &mut RecordStore, text: &str) -> IngestResult<usize> {
        match self.run_batch(store, text) {
            Ok(count) => {
                tracing::info!("batch complete: {} rows ingested", count);
                Ok(count)
            }
            Err(err) => Err(self.abort(store, err)),
        }
    }

    /// Encode a single data line against a header line without touching any store.
    pub fn preview(&mut self, header: &str, line: &str) -> IngestResult<WireMessage> {
        let extractor = RowExtractor::new(self.detector.detect_line(header)?);
        let row = extractor
            .extract(line, 2, self.ids.now())?
            .ok_or_else(|| IngestError::InvalidInput("data line is blank".into()))?;
        Ok(self.encoder.encode(&row, &mut self.ids))
    }

    fn run_batch(&mut self, store: &mut RecordStore, text: &str) -> IngestResult<usize> {
        if text.lines().count() < 2 {
            return Err(IngestError::EmptySource);
        }
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line));
        let Some((_, header)) = lines.next() else {
            return Err(IngestError::EmptySource);
        };
        let extractor = RowExtractor::new(self.detector.detect_line(header)?);

        let mut count = 0;
        for (line_no, line) in lines {
            match self.ingest_row(store, &extractor, line, line_no) {
                Ok(Some(patient_id)) => {
                    count += 1;
                    tracing::debug!("line {}: stored patient {}", line_no, patient_id);
                }
                Ok(None) => {}
                Err(err) if err.is_batch_level() => return Err(err),
                Err(err) => {
                    tracing::warn!("line {} rejected: {}", line_no, err);
                    let entry = IngestionLogEntry::row_failure(
                        &mut self.ids,
                        self.source,
                        format!("line {line_no} rejected: {err}"),
                    );
                    store.append_log(entry)?;
                }
            }
        }
        Ok(count)
    }

    /// Returns the stored patient id, or `None` for a blank line.
    fn ingest_row(
        &mut self,
        store: &mut RecordStore,
        extractor: &RowExtractor,
        line: &str,
        line_no: usize,
    ) -> IngestResult<Option<String>> {
        let Some(row) = extractor.extract(line, line_no, self.ids.now())? else {
            return Ok(None);
        };

        let message = self.encoder.encode(&row, &mut self.ids).render();
        let decoded = self
            .decoder
            .decode_text(&message, &mut self.ids)
            .map_err(|err| IngestError::from_decode(err, line_no))?;

        let patient_id = store
            .upsert_patient(decoded.patient, self.ids.now())?
            .id
            .clone();
        store.append_encounter(decoded.encounter)?;
        store.append_observations(decoded.observations)?;
        store.append_log(IngestionLogEntry::success(
            &mut self.ids,
            self.source,
            message,
            &patient_id,
        ))?;
        Ok(Some(patient_id))
    }

    /// Record a batch-level failure and hand the error back.
    fn abort(&mut self, store: &mut RecordStore, err: IngestError) -> IngestError {
        tracing::error!("batch aborted: {}", err);
        let entry = IngestionLogEntry::batch_failure(
            &mut self.ids,
            self.source,
            format!("Failed to ingest batch: {err}"),
        );
        if let Err(log_err) = store.append_log(entry) {
            tracing::error!("could not record batch failure: {}", log_err);
        }
        err
    }
}
