//! Sentiment scoring over canonical records.
//!
//! The model is built once, injected as `Arc<dyn SentimentModel>` and never
//! mutated. Scoring is total: empty text, non-string values, model failures and
//! non-finite confidences all collapse to [`Sentiment::NEUTRAL_FALLBACK`].

mod lexicon;
#[cfg(feature = "onnx")]
mod onnx;

pub use lexicon::LexiconModel;
#[cfg(feature = "onnx")]
pub use onnx::{OnnxModel, WordPieceTokenizer};

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ScorerConfig;
use crate::constants::scorer::{PROGRESS_LOG_EVERY, PROGRESS_LOG_MIN_BATCH};
use crate::control::{PassControl, ScoringProgress};
use crate::data::{CanonicalRecord, ScoredRecord, Sentiment};
use crate::errors::{ModelError, PipelineError};
use crate::utils::clean_text;

/// Text classifier backend.
///
/// Implementations must be safe to share across threads; the scorer calls
/// `classify` concurrently when parallel scoring is enabled.
pub trait SentimentModel: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Classify one non-empty text.
    fn classify(&self, text: &str) -> Result<Sentiment, ModelError>;
}

/// Applies a shared [`SentimentModel`] to record text.
#[derive(Clone)]
pub struct SentimentScorer {
    model: Arc<dyn SentimentModel>,
    config: ScorerConfig,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new(Arc::new(LexiconModel::new()))
    }
}

impl SentimentScorer {
    /// Wrap `model` with the default scorer settings.
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self {
            model,
            config: ScorerConfig::default(),
        }
    }

    /// Replace the scorer settings.
    pub fn with_config(mut self, config: ScorerConfig) -> Self {
        self.config = config;
        self
    }

    /// Name of the injected model.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// True when [`SentimentScorer::score_records`] fans out across the rayon pool.
    ///
    /// Requires both `ScorerConfig::parallel` and the `parallel` feature.
    pub fn runs_parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.config.parallel
    }

    /// Score one text. Never fails.
    pub fn score(&self, text: &str) -> Sentiment {
        if text.trim().is_empty() {
            return Sentiment::NEUTRAL_FALLBACK;
        }
        let cleaned;
        let input = if self.config.clean_text {
            cleaned = clean_text(text);
            if cleaned.is_empty() {
                return Sentiment::NEUTRAL_FALLBACK;
            }
            cleaned.as_str()
        } else {
            text
        };

        match self.model.classify(input) {
            Ok(sentiment) if sentiment.score.is_finite() => Sentiment {
                label: sentiment.label,
                score: sentiment.score.clamp(0.0, 1.0),
            },
            Ok(sentiment) => {
                warn!(
                    model = self.model.name(),
                    score = sentiment.score,
                    "non-finite sentiment score; using neutral fallback"
                );
                Sentiment::NEUTRAL_FALLBACK
            }
            Err(err) => {
                warn!(
                    model = self.model.name(),
                    error = %err,
                    "sentiment model failed; using neutral fallback"
                );
                Sentiment::NEUTRAL_FALLBACK
            }
        }
    }

    /// Score an arbitrary JSON value; anything but a string gets the fallback.
    pub fn score_value(&self, value: &Value) -> Sentiment {
        match value {
            Value::String(text) => self.score(text),
            _ => Sentiment::NEUTRAL_FALLBACK,
        }
    }

    /// Score every record, preserving order and length.
    ///
    /// Cancellation is checked before each record (sequential mode) or once
    /// per batch (parallel mode).
    pub fn score_records(
        &self,
        records: Vec<CanonicalRecord>,
        control: &PassControl,
    ) -> Result<Vec<ScoredRecord>, PipelineError> {
        let total = records.len();
        control.checkpoint("scoring")?;
        if total == 0 {
            return Ok(Vec::new());
        }

        if self.config.parallel && !self.runs_parallel() {
            warn!(
                model = self.model.name(),
                "parallel scoring requested without the `parallel` feature; scoring sequentially"
            );
        }
        #[cfg(feature = "parallel")]
        if self.runs_parallel() {
            return self.score_records_parallel(records, control);
        }

        let verbose = total >= PROGRESS_LOG_MIN_BATCH;
        let mut scored = Vec::with_capacity(total);
        for (index, record) in records.into_iter().enumerate() {
            control.checkpoint("scoring")?;
            let sentiment = self.score(&record.text);
            scored.push(ScoredRecord::new(record, sentiment));

            let done = index + 1;
            control.report(ScoringProgress {
                scored: done,
                total,
                cached: 0,
            });
            if verbose && done % PROGRESS_LOG_EVERY == 0 {
                info!(scored = done, total, model = self.model.name(), "scoring progress");
            }
        }
        debug!(records = total, model = self.model.name(), "scored batch");
        Ok(scored)
    }

    #[cfg(feature = "parallel")]
    fn score_records_parallel(
        &self,
        records: Vec<CanonicalRecord>,
        control: &PassControl,
    ) -> Result<Vec<ScoredRecord>, PipelineError> {
        use rayon::prelude::*;

        let total = records.len();
        let scored: Vec<ScoredRecord> = records
            .into_par_iter()
            .map(|record| {
                let sentiment = self.score(&record.text);
                ScoredRecord::new(record, sentiment)
            })
            .collect();
        control.checkpoint("scoring")?;
        control.report(ScoringProgress {
            scored: total,
            total,
            cached: 0,
        });
        debug!(records = total, model = self.model.name(), "scored batch in parallel");
        Ok(scored)
    }
}
