use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::data::RawRecord;
use crate::errors::PipelineError;
use crate::source::preprocess::process_envelope;
use crate::source::{RecordSource, SourceKind};
use crate::transport::fs::{processed_path, raw_path, read_json};

/// Filesystem source reading `<source_id>_processed_data.json` from a data directory.
///
/// The processed file is a JSON array of flat objects. When
/// `with_raw_fallback(true)` is set and the processed file is absent, the raw
/// dump (`<source_id>_data.json`) is processed in memory instead.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    kind: SourceKind,
    data_dir: PathBuf,
    raw_fallback: bool,
}

impl JsonFileSource {
    /// Create a source for `kind` rooted at `data_dir`.
    pub fn new(kind: SourceKind, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            data_dir: data_dir.into(),
            raw_fallback: false,
        }
    }

    /// Allow processing the raw dump when no processed dataset exists.
    pub fn with_raw_fallback(mut self, raw_fallback: bool) -> Self {
        self.raw_fallback = raw_fallback;
        self
    }

    /// Directory this source reads from.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the processed dataset this source reads.
    pub fn dataset_path(&self) -> PathBuf {
        processed_path(&self.data_dir, self.kind)
    }

    fn malformed(&self, details: impl Into<String>) -> PipelineError {
        PipelineError::Malformed {
            source_id: self.kind.source_id().to_string(),
            details: details.into(),
        }
    }
}

impl RecordSource for JsonFileSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn load(&self) -> Result<Vec<RawRecord>, PipelineError> {
        let processed = self.dataset_path();
        if processed.exists() {
            let value: serde_json::Value = read_json(&processed)?;
            let serde_json::Value::Array(items) = value else {
                return Err(self.malformed("processed dataset is not a JSON array"));
            };
            let mut rows = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                match item {
                    serde_json::Value::Object(object) => rows.push(object.into_iter().collect()),
                    _ => return Err(self.malformed(format!("row {idx} is not a JSON object"))),
                }
            }
            debug!(
                source = self.kind.source_id(),
                rows = rows.len(),
                path = %processed.display(),
                "loaded processed dataset"
            );
            return Ok(rows);
        }

        let raw = raw_path(&self.data_dir, self.kind);
        if self.raw_fallback && raw.exists() {
            info!(
                source = self.kind.source_id(),
                path = %raw.display(),
                "processed dataset missing; processing raw dump in memory"
            );
            let envelope: serde_json::Value = read_json(&raw)?;
            return process_envelope(self.kind, &envelope);
        }

        Err(PipelineError::MissingData {
            source_id: self.kind.source_id().to_string(),
            path: processed,
        })
    }
}
