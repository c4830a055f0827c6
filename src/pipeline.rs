use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alert::AlertDispatcher;
use crate::anomaly::{AnomalyDetector, DetectionReport, anomalies};
use crate::cache::ScoreCache;
use crate::config::PipelineConfig;
use crate::control::PassControl;
use crate::data::{AnnotatedRecord, CanonicalRecord, ScoredRecord};
use crate::errors::PipelineError;
use crate::filter::FilterParams;
use crate::normalize::normalize_records;
use crate::scoring::{LexiconModel, SentimentModel, SentimentScorer};
use crate::source::RecordSource;
use crate::types::LogMessage;

/// Result of one pipeline pass, handed to the presentation layer.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PassOutput {
    /// Filtered working set, annotated, in source order.
    pub records: Vec<AnnotatedRecord>,
    /// Flagged subset of `records`, in the same order.
    pub anomalies: Vec<AnnotatedRecord>,
    /// Non-fatal problems encountered during the pass.
    pub warnings: Vec<LogMessage>,
    /// Raw detector output for the working set.
    pub detection: DetectionReport,
    /// True when an alert was delivered this pass.
    pub alert_sent: bool,
}

/// Normalize → score → filter → detect → alert, for one source at a time.
///
/// Scored records are cached by identity across passes, so changing filter
/// parameters does not re-run the model. Detection always runs on the
/// current working set.
pub struct Pipeline {
    scorer: SentimentScorer,
    detector: AnomalyDetector,
    dispatcher: AlertDispatcher,
    cache: ScoreCache,
}

impl Pipeline {
    /// Assemble a pipeline from explicit stages.
    pub fn new(
        scorer: SentimentScorer,
        detector: AnomalyDetector,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            scorer,
            detector,
            dispatcher,
            cache: ScoreCache::new(PipelineConfig::default().score_cache_capacity),
        }
    }

    /// Build every stage from configuration using the built-in lexicon model.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_model(config, Arc::new(LexiconModel::new()))
    }

    /// Build every stage from configuration around an injected model.
    pub fn with_model(
        config: &PipelineConfig,
        model: Arc<dyn SentimentModel>,
    ) -> Result<Self, PipelineError> {
        let scorer = SentimentScorer::new(model).with_config(config.scorer.clone());
        let detector = AnomalyDetector::new(config.detector.clone())?;
        let dispatcher = AlertDispatcher::from_config(&config.alerts);
        Ok(Self::new(scorer, detector, dispatcher).with_cache(ScoreCache::new(
            config.score_cache_capacity,
        )))
    }

    /// Replace the score cache (e.g. to share one between pipelines).
    pub fn with_cache(mut self, cache: ScoreCache) -> Self {
        self.cache = cache;
        self
    }

    /// Score cache shared across passes.
    pub fn cache(&self) -> &ScoreCache {
        &self.cache
    }

    /// Scorer applied to cache misses.
    pub fn scorer(&self) -> &SentimentScorer {
        &self.scorer
    }

    /// Run one pass over `source`.
    ///
    /// Missing data, schema problems and cancellation abort the pass. Alert
    /// delivery failures are recorded in `warnings` and the annotated dataset
    /// is still returned.
    pub fn run_pass(
        &self,
        source: &dyn RecordSource,
        filter: &FilterParams,
        control: &PassControl,
    ) -> Result<PassOutput, PipelineError> {
        control.checkpoint("loading")?;
        let raw = source.load()?;
        info!(source = source.id(), records = raw.len(), "loaded records");

        control.checkpoint("normalizing")?;
        let canonical = normalize_records(&raw, source.kind())?;

        let scored = self.score_with_cache(canonical, control)?;

        control.checkpoint("filtering")?;
        let working_set = filter.apply_owned(scored);
        debug!(
            source = source.id(),
            working_set = working_set.len(),
            keyword = filter.keyword.as_deref().unwrap_or(""),
            "filtered working set"
        );

        control.checkpoint("detection")?;
        let (records, detection) = self.detector.annotate(working_set);
        let anomalies = anomalies(&records);

        let mut warnings = Vec::new();
        let alert_sent = match self.dispatcher.dispatch(anomalies.len()) {
            Ok(sent) => sent,
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "alert dispatch failed; continuing");
                warnings.push(err.to_string());
                false
            }
            Err(err) => return Err(err),
        };

        info!(
            source = source.id(),
            records = records.len(),
            anomalies = anomalies.len(),
            alert_sent,
            "pipeline pass complete"
        );
        Ok(PassOutput {
            records,
            anomalies,
            warnings,
            detection,
            alert_sent,
        })
    }

    fn score_with_cache(
        &self,
        canonical: Vec<CanonicalRecord>,
        control: &PassControl,
    ) -> Result<Vec<ScoredRecord>, PipelineError> {
        let total = canonical.len();
        let mut slots: Vec<Option<ScoredRecord>> = Vec::with_capacity(total);
        let mut misses = Vec::new();
        let mut miss_slots = Vec::new();
        for record in canonical {
            match self.cache.lookup(&record) {
                Some(sentiment) => slots.push(Some(ScoredRecord::new(record, sentiment))),
                None => {
                    miss_slots.push(slots.len());
                    slots.push(None);
                    misses.push(record);
                }
            }
        }
        let cached = total - misses.len();

        let fresh = self
            .scorer
            .score_records(misses, &control.offset_by_cached(cached))?;
        self.cache.store(fresh.iter());
        for (slot, scored) in miss_slots.into_iter().zip(fresh) {
            slots[slot] = Some(scored);
        }
        debug!(
            records = total,
            cached,
            cache_len = self.cache.len(),
            "scored records"
        );
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertSink;
    use crate::control::CancelFlag;
    use crate::data::{RawRecord, Sentiment, SentimentLabel};
    use crate::errors::{AlertError, ModelError};
    use crate::source::{InMemorySource, SourceKind};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reads the score straight out of the text (`"score:0.5"`).
    #[derive(Default)]
    struct ScriptedModel {
        calls: AtomicUsize,
    }

    impl SentimentModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn classify(&self, text: &str) -> Result<Sentiment, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let score = text
                .split_whitespace()
                .find_map(|token| token.strip_prefix("score:"))
                .and_then(|raw| raw.parse::<f64>().ok())
                .ok_or_else(|| ModelError::InvalidPrediction(text.to_string()))?;
            Ok(Sentiment {
                label: SentimentLabel::Positive,
                score,
            })
        }
    }

    #[derive(Default)]
    struct CountingSink {
        sent: Mutex<usize>,
    }

    impl AlertSink for CountingSink {
        fn send(&self, _subject: &str, _message: &str) -> Result<(), AlertError> {
            *self.sent.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct FailingSink;

    impl AlertSink for FailingSink {
        fn send(&self, _subject: &str, _message: &str) -> Result<(), AlertError> {
            Err(AlertError::Transport("smtp down".into()))
        }
    }

    fn raw(value: Value) -> RawRecord {
        value
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn social_rows() -> Vec<RawRecord> {
        let scores = [0.50, 0.52, 0.48, 0.55, 0.45, 0.51, 0.99, 0.49, 0.53, 0.47, 0.54, 0.46];
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| {
                raw(json!({
                    "text": format!("post {i} score:{score}"),
                    "posted": format!("2024-01-{:02} 10:00:00", i + 1),
                }))
            })
            .collect()
    }

    fn pipeline(model: Arc<ScriptedModel>, sink: Arc<dyn AlertSink>) -> Pipeline {
        Pipeline::new(
            SentimentScorer::new(model),
            AnomalyDetector::default(),
            AlertDispatcher::new(sink),
        )
    }

    #[test]
    fn pass_flags_outlier_and_alerts_once() {
        let sink = Arc::new(CountingSink::default());
        let pipeline = pipeline(Arc::new(ScriptedModel::default()), sink.clone());
        let source = InMemorySource::new(SourceKind::Social, social_rows());
        let output = pipeline
            .run_pass(&source, &FilterParams::all(), &PassControl::none())
            .unwrap();
        assert_eq!(output.records.len(), 12);
        assert_eq!(output.anomalies.len(), 1);
        assert_eq!(output.anomalies[0].scored.sentiment_score, 0.99);
        assert!(output.records[6].is_anomaly);
        assert!(output.alert_sent);
        assert!(output.warnings.is_empty());
        assert_eq!(*sink.sent.lock().unwrap(), 1);
    }

    #[test]
    fn alert_failure_is_a_warning_not_an_error() {
        let pipeline = pipeline(Arc::new(ScriptedModel::default()), Arc::new(FailingSink));
        let source = InMemorySource::new(SourceKind::Social, social_rows());
        let output = pipeline
            .run_pass(&source, &FilterParams::all(), &PassControl::none())
            .unwrap();
        assert_eq!(output.records.len(), 12);
        assert!(!output.alert_sent);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].contains("smtp down"));
    }

    #[test]
    fn filter_changes_reuse_cached_scores() {
        let model = Arc::new(ScriptedModel::default());
        let pipeline = pipeline(model.clone(), Arc::new(CountingSink::default()));
        let source = InMemorySource::new(SourceKind::Social, social_rows());
        pipeline
            .run_pass(&source, &FilterParams::all(), &PassControl::none())
            .unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 12);

        let narrowed = pipeline
            .run_pass(
                &source,
                &FilterParams::all().with_keyword("post 1"),
                &PassControl::none(),
            )
            .unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 12);
        // "post 1", "post 10", "post 11"
        assert_eq!(narrowed.records.len(), 3);
        assert!(!narrowed.detection.was_analysed());
        assert!(narrowed.anomalies.is_empty());
        assert_eq!(pipeline.cache().stats().hits, 12);
    }

    #[test]
    fn small_working_set_sends_no_alert() {
        let sink = Arc::new(CountingSink::default());
        let pipeline = pipeline(Arc::new(ScriptedModel::default()), sink.clone());
        let rows: Vec<RawRecord> = social_rows().into_iter().take(9).collect();
        let source = InMemorySource::new(SourceKind::Social, rows);
        let output = pipeline
            .run_pass(&source, &FilterParams::all(), &PassControl::none())
            .unwrap();
        assert!(output.anomalies.is_empty());
        assert_eq!(*sink.sent.lock().unwrap(), 0);
    }

    #[test]
    fn schema_errors_abort_the_pass() {
        let pipeline = pipeline(
            Arc::new(ScriptedModel::default()),
            Arc::new(CountingSink::default()),
        );
        let source = InMemorySource::new(SourceKind::News, vec![raw(json!({"text": "x"}))]);
        let err = pipeline
            .run_pass(&source, &FilterParams::all(), &PassControl::none())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }

    #[test]
    fn cancelled_pass_stops_before_loading() {
        let pipeline = pipeline(
            Arc::new(ScriptedModel::default()),
            Arc::new(CountingSink::default()),
        );
        let flag = CancelFlag::new();
        flag.cancel();
        let source = InMemorySource::new(SourceKind::Social, social_rows());
        let err = pipeline
            .run_pass(
                &source,
                &FilterParams::all(),
                &PassControl::none().with_cancel(flag),
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled { stage: "loading" }));
    }
}
