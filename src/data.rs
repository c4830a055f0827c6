use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::types::{FieldName, RecordId, SourceLabel};

/// Source-specific record as produced by acquisition: ordered column name → JSON value.
pub type RawRecord = IndexMap<FieldName, serde_json::Value>;

/// Point in time attached to a record, or an explicit marker for unparseable input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTimestamp {
    /// Successfully parsed UTC timestamp.
    Known(DateTime<Utc>),
    /// The source value was missing or could not be parsed.
    Unknown,
}

impl RecordTimestamp {
    /// Return the parsed timestamp, if any.
    pub fn known(&self) -> Option<DateTime<Utc>> {
        match self {
            RecordTimestamp::Known(ts) => Some(*ts),
            RecordTimestamp::Unknown => None,
        }
    }

    /// Calendar date (UTC) of a known timestamp.
    pub fn date(&self) -> Option<NaiveDate> {
        self.known().map(|ts| ts.date_naive())
    }

    /// True when the source value could not be parsed.
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordTimestamp::Unknown)
    }
}

impl From<DateTime<Utc>> for RecordTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        RecordTimestamp::Known(value)
    }
}

impl fmt::Display for RecordTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordTimestamp::Known(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            RecordTimestamp::Unknown => f.write_str("unknown"),
        }
    }
}

/// Source-agnostic record shape used by every stage after normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Content-derived identity (stable across passes over the same dataset).
    pub id: RecordId,
    /// Publication/post time, or `Unknown` when the raw value was unusable.
    pub timestamp: RecordTimestamp,
    /// Primary textual content; empty when the source had none.
    pub text: String,
    /// Display label for the originating source (e.g. `Google News`).
    pub source: SourceLabel,
    /// Link back to the original item, when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Categorical outcome of the sentiment model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentLabel {
    /// Favourable tone.
    Positive,
    /// Unfavourable tone.
    Negative,
    /// No clear tone, also the fallback for empty input.
    Neutral,
}

impl SentimentLabel {
    /// Display name used in charts and tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Label plus the model's confidence in it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Predicted class.
    pub label: SentimentLabel,
    /// Confidence for `label`, always within `[0, 1]`.
    pub score: f64,
}

impl Sentiment {
    /// Fallback assigned to empty or non-text input.
    pub const NEUTRAL_FALLBACK: Sentiment = Sentiment {
        label: SentimentLabel::Neutral,
        score: crate::constants::scorer::FALLBACK_SCORE,
    };
}

/// Canonical record with its sentiment attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// Normalized record the score belongs to.
    #[serde(flatten)]
    pub record: CanonicalRecord,
    /// Predicted class.
    pub sentiment_label: SentimentLabel,
    /// Confidence for `sentiment_label`, within `[0, 1]`.
    pub sentiment_score: f64,
}

impl ScoredRecord {
    /// Attach a sentiment to a canonical record.
    pub fn new(record: CanonicalRecord, sentiment: Sentiment) -> Self {
        Self {
            record,
            sentiment_label: sentiment.label,
            sentiment_score: sentiment.score,
        }
    }

    /// Label and score as a pair.
    pub fn sentiment(&self) -> Sentiment {
        Sentiment {
            label: self.sentiment_label,
            score: self.sentiment_score,
        }
    }
}

/// Scored record annotated with its anomaly status within the current working set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    /// Record with its sentiment.
    #[serde(flatten)]
    pub scored: ScoredRecord,
    /// Set only by the anomaly detector; relative to the working set it was computed on.
    #[serde(default)]
    pub is_anomaly: bool,
}

impl From<ScoredRecord> for AnnotatedRecord {
    fn from(scored: ScoredRecord) -> Self {
        Self {
            scored,
            is_anomaly: false,
        }
    }
}

/// Read access to the canonical part of any pipeline record.
pub trait RecordView {
    /// Canonical fields of this record.
    fn canonical(&self) -> &CanonicalRecord;

    /// Record timestamp.
    fn timestamp(&self) -> RecordTimestamp {
        self.canonical().timestamp
    }

    /// Record text.
    fn text(&self) -> &str {
        &self.canonical().text
    }
}

/// Read access to the scored part of any pipeline record.
pub trait ScoredView: RecordView {
    /// Scored fields of this record.
    fn scored(&self) -> &ScoredRecord;
}

impl RecordView for CanonicalRecord {
    fn canonical(&self) -> &CanonicalRecord {
        self
    }
}

impl RecordView for ScoredRecord {
    fn canonical(&self) -> &CanonicalRecord {
        &self.record
    }
}

impl ScoredView for ScoredRecord {
    fn scored(&self) -> &ScoredRecord {
        self
    }
}

impl RecordView for AnnotatedRecord {
    fn canonical(&self) -> &CanonicalRecord {
        &self.scored.record
    }
}

impl ScoredView for AnnotatedRecord {
    fn scored(&self) -> &ScoredRecord {
        &self.scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn canonical(text: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: "google_news::1".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().into(),
            text: text.into(),
            source: "Google News".into(),
            url: None,
        }
    }

    #[test]
    fn unknown_timestamp_serializes_as_null() {
        let mut record = canonical("alpha");
        record.timestamp = RecordTimestamp::Unknown;
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["timestamp"].is_null());

        let back: CanonicalRecord = serde_json::from_value(json).unwrap();
        assert!(back.timestamp.is_unknown());
    }

    #[test]
    fn annotated_record_flattens_fields() {
        let scored = ScoredRecord::new(
            canonical("Markets rally"),
            Sentiment {
                label: SentimentLabel::Positive,
                score: 0.9,
            },
        );
        let annotated = AnnotatedRecord::from(scored);
        let json = serde_json::to_value(&annotated).unwrap();
        assert_eq!(json["text"], "Markets rally");
        assert_eq!(json["sentiment_label"], "Positive");
        assert_eq!(json["is_anomaly"], false);
        assert_eq!(annotated.text(), "Markets rally");
    }

    #[test]
    fn unknown_timestamps_sort_after_known_ones() {
        let known = RecordTimestamp::Known(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(known < RecordTimestamp::Unknown);
        assert_eq!(RecordTimestamp::Unknown.to_string(), "unknown");
        assert_eq!(known.to_string(), "2024-01-01 00:00:00");
    }
}
