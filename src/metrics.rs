use indexmap::IndexMap;
use serde::Serialize;

use crate::constants::metrics::{RECENT_POSTS, TREND_WINDOW};
use crate::data::{AnnotatedRecord, RecordTimestamp, ScoredView, SentimentLabel};
use crate::types::SourceLabel;

/// Count of one sentiment label within a working set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelShare {
    /// Label being counted.
    pub label: SentimentLabel,
    /// Records carrying the label.
    pub count: usize,
    /// Fraction of the working set, in `[0, 1]`.
    pub share: f64,
}

/// One point on a per-source trend line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendPoint {
    /// Record timestamp.
    pub timestamp: RecordTimestamp,
    /// Sentiment score of the record.
    pub score: f64,
    /// Mean of this and the previous `window - 1` scores of the same source;
    /// `None` until the window is full.
    pub rolling_mean: Option<f64>,
}

/// Trend line for one source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceTrend {
    /// Display label of the source.
    pub source: SourceLabel,
    /// Points in working-set order.
    pub points: Vec<TrendPoint>,
}

/// Row of the recent-posts table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecentPost {
    /// Record timestamp.
    pub timestamp: RecordTimestamp,
    /// Record text.
    pub text: String,
    /// Predicted class.
    pub sentiment: SentimentLabel,
    /// Confidence for `sentiment`.
    pub sentiment_score: f64,
    /// Display label of the source.
    pub source: SourceLabel,
    /// Flagged by the anomaly detector.
    pub is_anomaly: bool,
}

/// Everything the dashboard renders for one pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Records in the working set.
    pub records: usize,
    /// Records flagged as anomalous.
    pub anomalies: usize,
    /// Label counts, most frequent first.
    pub breakdown: Vec<LabelShare>,
    /// Mean sentiment score; `None` for an empty working set.
    pub average_score: Option<f64>,
    /// Rolling trend per source, in order of first appearance.
    pub trends: Vec<SourceTrend>,
    /// Most recent posts, newest first.
    pub recent: Vec<RecentPost>,
}

impl DashboardSummary {
    /// Compute every dashboard aggregate with the default window and row limits.
    pub fn from_records(records: &[AnnotatedRecord]) -> Self {
        Self {
            records: records.len(),
            anomalies: records.iter().filter(|record| record.is_anomaly).count(),
            breakdown: sentiment_breakdown(records),
            average_score: average_score(records),
            trends: rolling_trend(records, TREND_WINDOW),
            recent: recent_posts(records, RECENT_POSTS),
        }
    }
}

/// Label counts, most frequent first (ties in label order).
pub fn sentiment_breakdown<T: ScoredView>(records: &[T]) -> Vec<LabelShare> {
    let mut counts: IndexMap<SentimentLabel, usize> = IndexMap::new();
    for record in records {
        *counts.entry(record.scored().sentiment_label).or_insert(0) += 1;
    }
    let total = records.len();
    let mut shares: Vec<LabelShare> = counts
        .into_iter()
        .map(|(label, count)| LabelShare {
            label,
            count,
            share: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            },
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    shares
}

/// Mean sentiment score, or `None` for an empty set.
pub fn average_score<T: ScoredView>(records: &[T]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let sum: f64 = records
        .iter()
        .map(|record| record.scored().sentiment_score)
        .sum();
    Some(sum / records.len() as f64)
}

/// Per-source rolling mean of sentiment scores.
///
/// Sources appear in order of first occurrence; points keep working-set order.
pub fn rolling_trend<T: ScoredView>(records: &[T], window: usize) -> Vec<SourceTrend> {
    let window = window.max(1);
    let mut grouped: IndexMap<&str, Vec<(RecordTimestamp, f64)>> = IndexMap::new();
    for record in records {
        grouped
            .entry(record.canonical().source.as_str())
            .or_default()
            .push((record.timestamp(), record.scored().sentiment_score));
    }
    grouped
        .into_iter()
        .map(|(source, series)| {
            let points = series
                .iter()
                .enumerate()
                .map(|(i, (timestamp, score))| TrendPoint {
                    timestamp: *timestamp,
                    score: *score,
                    rolling_mean: (i + 1 >= window).then(|| {
                        series[i + 1 - window..=i].iter().map(|(_, s)| s).sum::<f64>()
                            / window as f64
                    }),
                })
                .collect();
            SourceTrend {
                source: source.to_string(),
                points,
            }
        })
        .collect()
}

/// Newest `limit` records by timestamp; unknown timestamps sort last.
pub fn recent_posts(records: &[AnnotatedRecord], limit: usize) -> Vec<RecentPost> {
    let mut ordered: Vec<&AnnotatedRecord> = records.iter().collect();
    // Stable sort keeps working-set order among equal timestamps.
    ordered.sort_by(|a, b| {
        let (a, b) = (a.scored.record.timestamp, b.scored.record.timestamp);
        match (a, b) {
            (RecordTimestamp::Known(a), RecordTimestamp::Known(b)) => b.cmp(&a),
            _ => a.cmp(&b),
        }
    });
    ordered
        .into_iter()
        .take(limit)
        .map(|record| RecentPost {
            timestamp: record.scored.record.timestamp,
            text: record.scored.record.text.clone(),
            sentiment: record.scored.sentiment_label,
            sentiment_score: record.scored.sentiment_score,
            source: record.scored.record.source.clone(),
            is_anomaly: record.is_anomaly,
        })
        .collect()
}
