use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{FieldName, SourceId};

/// Error type for dataset loading, schema resolution, and alert delivery failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Dataset file absent; the pass halts.
    #[error("data for source '{source_id}' not found at {}", path.display())]
    MissingData {
        /// Dataset the pass asked for.
        source_id: SourceId,
        /// Path that was looked up.
        path: PathBuf,
    },
    /// Required column absent from every row; the pass halts.
    #[error("source '{source_id}' is missing required column '{field}'")]
    Schema {
        /// Dataset being normalized.
        source_id: SourceId,
        /// Primary name of the missing column.
        field: FieldName,
    },
    /// Alert sink failure; recovered into a pass warning.
    #[error("alert dispatch failed: {0}")]
    AlertDispatch(#[from] AlertError),
    /// Cancellation flag observed at a checkpoint.
    #[error("pipeline pass cancelled during {stage}")]
    Cancelled {
        /// Stage that observed the flag.
        stage: &'static str,
    },
    /// Invalid settings or filter parameters.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Dataset file present but not shaped as expected.
    #[error("source '{source_id}' returned malformed data: {details}")]
    Malformed {
        /// Dataset being read.
        source_id: SourceId,
        /// What was wrong with it.
        details: String,
    },
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON decode or encode failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// True for failures that leave the primary pipeline output intact.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::AlertDispatch(_))
    }
}

/// Transport-level failure raised by an alert sink.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Delivery channel could not be reached.
    #[error("alert transport unavailable: {0}")]
    Transport(String),
    /// Sink refused the message, for example for a missing recipient.
    #[error("alert sink rejected message: {0}")]
    Rejected(String),
    /// Spool write failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure raised by a sentiment model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Backend could not be loaded or invoked.
    #[error("model backend unavailable: {0}")]
    Unavailable(String),
    /// Backend output could not be mapped to a sentiment.
    #[error("model returned an invalid prediction: {0}")]
    InvalidPrediction(String),
}
