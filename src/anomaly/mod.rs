//! Working-set anomaly detection over sentiment scores.
//!
//! Detection is a snapshot: flags are only meaningful relative to the records
//! they were computed on and must be recomputed whenever the working set
//! changes.

mod isolation_forest;
mod rng;

pub use isolation_forest::IsolationForest;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DetectorConfig;
use crate::data::{AnnotatedRecord, ScoredRecord, ScoredView};
use crate::errors::PipelineError;

/// Per-record detection outcome for one working set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Outlier flag per input record, in input order.
    pub flags: Vec<bool>,
    /// Isolation score per input record; empty when the set was too small.
    pub scores: Vec<f64>,
    /// Fitted threshold, or `None` when detection was skipped.
    pub threshold: Option<f64>,
}

impl DetectionReport {
    fn skipped(len: usize) -> Self {
        Self {
            flags: vec![false; len],
            scores: Vec::new(),
            threshold: None,
        }
    }

    /// Number of flagged records.
    pub fn anomaly_count(&self) -> usize {
        self.flags.iter().filter(|flag| **flag).count()
    }

    /// True when the working set was large enough to analyse.
    pub fn was_analysed(&self) -> bool {
        self.threshold.is_some()
    }
}

/// Flags records whose sentiment score is unusual within the working set.
#[derive(Clone, Debug, Default)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    /// Build a detector, rejecting settings the forest cannot use.
    pub fn new(config: DetectorConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Validated detector settings.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Score the working set and flag outliers.
    ///
    /// Sets smaller than `min_working_set` are never analysed and nothing is
    /// flagged. Identical input in identical order always yields identical flags.
    pub fn detect<T: ScoredView>(&self, records: &[T]) -> DetectionReport {
        if records.len() < self.config.min_working_set {
            debug!(
                records = records.len(),
                min = self.config.min_working_set,
                "working set too small for anomaly detection"
            );
            return DetectionReport::skipped(records.len());
        }
        let values: Vec<f64> = records
            .iter()
            .map(|record| record.scored().sentiment_score)
            .collect();
        let Some(forest) = IsolationForest::fit(&values, &self.config) else {
            return DetectionReport::skipped(records.len());
        };
        let scores = forest.score_all(&values);
        let flags: Vec<bool> = scores.iter().map(|score| forest.is_outlier(*score)).collect();
        let report = DetectionReport {
            flags,
            scores,
            threshold: Some(forest.threshold()),
        };
        debug!(
            records = records.len(),
            anomalies = report.anomaly_count(),
            threshold = forest.threshold(),
            "anomaly detection complete"
        );
        report
    }

    /// Attach the flags from [`AnomalyDetector::detect`] to each record.
    pub fn annotate(&self, records: Vec<ScoredRecord>) -> (Vec<AnnotatedRecord>, DetectionReport) {
        let report = self.detect(&records);
        let annotated = records
            .into_iter()
            .zip(report.flags.iter())
            .map(|(scored, flag)| AnnotatedRecord {
                scored,
                is_anomaly: *flag,
            })
            .collect();
        (annotated, report)
    }
}

/// Flagged subset of an annotated working set, preserving order.
pub fn anomalies(records: &[AnnotatedRecord]) -> Vec<AnnotatedRecord> {
    records
        .iter()
        .filter(|record| record.is_anomaly)
        .cloned()
        .collect()
}
