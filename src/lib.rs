#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Anomaly notification sinks and the per-pass dispatcher.
pub mod alert;
/// Isolation forest anomaly detection over sentiment scores.
pub mod anomaly;
/// Cross-pass cache of scored records.
pub mod cache;
/// Reusable CLI runners shared by the demo binaries.
pub mod cli;
/// Pipeline, scorer, detector, and alert configuration.
pub mod config;
/// Centralized constants used across normalizer, scorer, detector, and sources.
pub mod constants;
/// Cancellation and progress hooks.
pub mod control;
/// Raw, canonical, scored, and annotated record types.
pub mod data;
/// Date-range and keyword predicates.
pub mod filter;
mod hash;
/// Dashboard aggregates (breakdown, gauge, trend, recent posts).
pub mod metrics;
/// Source-specific to canonical record mapping.
pub mod normalize;
/// One-pass orchestration of every stage.
pub mod pipeline;
/// Sentiment model trait, scorer, the built-in lexicon model and the optional ONNX backend.
pub mod scoring;
/// Record source traits, built-in sources, and raw dump preprocessing.
pub mod source;
/// Timestamp parsing for heterogeneous source formats.
pub mod timestamps;
/// Input transports used by sources (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

mod errors;

pub use alert::{AlertDispatcher, AlertSink, FileSpoolSink, LogSink};
pub use anomaly::{AnomalyDetector, DetectionReport};
pub use cache::ScoreCache;
pub use config::{AlertConfig, DetectorConfig, PipelineConfig, ScorerConfig};
pub use control::{CancelFlag, PassControl, ScoringProgress};
pub use data::{
    AnnotatedRecord, CanonicalRecord, RawRecord, RecordTimestamp, ScoredRecord, Sentiment,
    SentimentLabel,
};
pub use errors::{AlertError, ModelError, PipelineError};
pub use filter::{DateRange, FilterParams};
pub use metrics::DashboardSummary;
pub use normalize::normalize_records;
pub use pipeline::{PassOutput, Pipeline};
pub use scoring::{LexiconModel, SentimentModel, SentimentScorer};
#[cfg(feature = "onnx")]
pub use scoring::OnnxModel;
pub use source::{InMemorySource, JsonFileSource, RecordSource, SourceKind};
pub use types::{FieldName, HashPart, Keyword, LogMessage, RecordId, SourceId, SourceLabel};
