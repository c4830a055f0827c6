//! Record source interfaces and built-in sources.
//!
//! Ownership model:
//! - `RecordSource` is the pipeline-facing acquisition interface; it yields the
//!   raw records of one source in their original order.
//! - `SourceKind` carries the per-source schema knowledge (dataset ids, timestamp
//!   column candidates, raw envelope keys) shared by sources and the normalizer.
//! - Sources never normalize; they hand raw rows to `normalize::normalize_records`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::constants::datasets::{
    NEWS_ENVELOPE_KEY, NEWS_SOURCE_ID, SOCIAL_ENVELOPE_KEY, SOCIAL_SOURCE_ID,
};
use crate::constants::normalizer::{
    FALLBACK_TIMESTAMP_FIELD, NEWS_TIMESTAMP_FIELD, SOCIAL_TIMESTAMP_FIELD,
};
use crate::data::RawRecord;
use crate::errors::PipelineError;
use crate::utils::display_label;

/// Raw-dump flattening and column selection.
pub mod preprocess;
/// Source implementation modules.
pub mod sources;

pub use sources::json_file::JsonFileSource;

/// The two upstream sources the dashboard can switch between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// News articles (title/description/publishedAt/source.name/url).
    News,
    /// Social posts (title/text/sentiment/image/url/user.name/posted).
    Social,
}

impl SourceKind {
    /// Every supported source, in selector order.
    pub const ALL: [SourceKind; 2] = [SourceKind::Social, SourceKind::News];

    /// Dataset identifier used in file names and record ids.
    pub fn source_id(&self) -> &'static str {
        match self {
            SourceKind::News => NEWS_SOURCE_ID,
            SourceKind::Social => SOCIAL_SOURCE_ID,
        }
    }

    /// Display label attached to canonical records (`Google News`, `Social Searcher`).
    pub fn label(&self) -> String {
        display_label(self.source_id())
    }

    /// Timestamp columns in resolution order: primary, then fallback.
    pub fn timestamp_fields(&self) -> [&'static str; 2] {
        match self {
            SourceKind::News => [NEWS_TIMESTAMP_FIELD, FALLBACK_TIMESTAMP_FIELD],
            SourceKind::Social => [SOCIAL_TIMESTAMP_FIELD, FALLBACK_TIMESTAMP_FIELD],
        }
    }

    /// Top-level key holding the item list in a raw acquisition dump.
    pub fn envelope_key(&self) -> &'static str {
        match self {
            SourceKind::News => NEWS_ENVELOPE_KEY,
            SourceKind::Social => SOCIAL_ENVELOPE_KEY,
        }
    }

    /// Resolve a dataset identifier back to its kind.
    pub fn from_source_id(source_id: &str) -> Option<Self> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.source_id() == source_id)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_id())
    }
}

/// Acquisition interface consumed by the pipeline.
///
/// For a fixed upstream state, `load` must return the same records in the same
/// order; anomaly detection is only reproducible on identically ordered input.
pub trait RecordSource: Send + Sync {
    /// Which schema this source produces.
    fn kind(&self) -> SourceKind;

    /// Stable dataset identifier used in errors and record ids.
    fn id(&self) -> &str {
        self.kind().source_id()
    }

    /// Load every raw record for the current query, in source order.
    ///
    /// Return `PipelineError::MissingData` when the dataset does not exist at all.
    fn load(&self) -> Result<Vec<RawRecord>, PipelineError>;
}

/// In-memory source for tests and embedding callers that already hold rows.
pub struct InMemorySource {
    kind: SourceKind,
    records: Arc<Vec<RawRecord>>,
}

impl InMemorySource {
    /// Create an in-memory source from prebuilt raw records.
    pub fn new(kind: SourceKind, records: Vec<RawRecord>) -> Self {
        Self {
            kind,
            records: Arc::new(records),
        }
    }

    /// Number of rows held by this source.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the source holds no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for InMemorySource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn load(&self) -> Result<Vec<RawRecord>, PipelineError> {
        Ok(self.records.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_kind_exposes_schema_details() {
        assert_eq!(SourceKind::News.source_id(), "google_news");
        assert_eq!(SourceKind::News.label(), "Google News");
        assert_eq!(SourceKind::Social.label(), "Social Searcher");
        assert_eq!(
            SourceKind::News.timestamp_fields(),
            ["publishedAt", "timestamp"]
        );
        assert_eq!(SourceKind::Social.timestamp_fields(), ["posted", "timestamp"]);
        assert_eq!(SourceKind::Social.envelope_key(), "posts");
    }

    #[test]
    fn source_kind_round_trips_through_source_id() {
        for kind in SourceKind::ALL {
            assert_eq!(SourceKind::from_source_id(kind.source_id()), Some(kind));
        }
        assert_eq!(SourceKind::from_source_id("twitter"), None);
    }

    #[test]
    fn in_memory_source_preserves_order() {
        let rows: Vec<RawRecord> = (0..3)
            .map(|idx| {
                let mut row = RawRecord::new();
                row.insert("text".into(), json!(format!("post {idx}")));
                row
            })
            .collect();
        let source = InMemorySource::new(SourceKind::Social, rows.clone());
        assert_eq!(source.id(), "social_searcher");
        assert_eq!(source.len(), 3);
        assert_eq!(source.load().unwrap(), rows);
        assert_eq!(source.load().unwrap(), rows);
    }
}
