use std::path::PathBuf;

use crate::constants::alert::{DEFAULT_RECIPIENT, DEFAULT_SENDER};
use crate::constants::datasets::DEFAULT_DATA_DIR;
use crate::constants::detector::{
    CONTAMINATION, MAX_SAMPLES, MIN_WORKING_SET, N_ESTIMATORS, SEED,
};
use crate::constants::env;
use crate::errors::PipelineError;

/// Controls how record text is scored.
#[derive(Clone, Debug, Default)]
pub struct ScorerConfig {
    /// Run `utils::clean_text` on each text before classification.
    pub clean_text: bool,
    /// Score records on the rayon pool (requires the `parallel` feature; ignored otherwise).
    pub parallel: bool,
}

impl ScorerConfig {
    /// Enable or disable the text-cleaning pre-step.
    pub fn with_clean_text(mut self, clean_text: bool) -> Self {
        self.clean_text = clean_text;
        self
    }

    /// Enable or disable data-parallel scoring.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Isolation forest settings for the anomaly detector.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Working sets smaller than this are never analysed.
    pub min_working_set: usize,
    /// Expected fraction of outliers (0, 0.5].
    pub contamination: f64,
    /// RNG seed for subsampling and split selection.
    pub seed: u64,
    /// Number of isolation trees.
    pub n_estimators: usize,
    /// Subsample size per tree (capped at the working-set size).
    pub max_samples: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_working_set: MIN_WORKING_SET,
            contamination: CONTAMINATION,
            seed: SEED,
            n_estimators: N_ESTIMATORS,
            max_samples: MAX_SAMPLES,
        }
    }
}

impl DetectorConfig {
    /// Override the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Override the number of trees.
    pub fn with_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Override the expected outlier fraction.
    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }

    /// Reject settings the forest cannot be fitted with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(PipelineError::Configuration(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.n_estimators == 0 {
            return Err(PipelineError::Configuration(
                "n_estimators must be greater than zero".into(),
            ));
        }
        if self.max_samples < 2 {
            return Err(PipelineError::Configuration(
                "max_samples must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

/// Alert delivery settings. Credentials and addresses are injected, never hardcoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertConfig {
    /// Master switch; when false the dispatcher never calls its sink.
    pub enabled: bool,
    /// Sender address written into spooled messages.
    pub sender: String,
    /// Recipient address written into spooled messages.
    pub recipient: String,
    /// Outbox directory for the file spool sink; `None` logs alerts instead.
    pub outbox: Option<PathBuf>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sender: DEFAULT_SENDER.to_string(),
            recipient: DEFAULT_RECIPIENT.to_string(),
            outbox: None,
        }
    }
}

impl AlertConfig {
    /// Load alert settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load alert settings through an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(env::ALERTS_ENABLED) {
            config.enabled = parse_flag(&raw).unwrap_or(config.enabled);
        }
        if let Some(sender) = lookup(env::ALERT_SENDER).filter(|value| !value.trim().is_empty()) {
            config.sender = sender.trim().to_string();
        }
        if let Some(recipient) =
            lookup(env::ALERT_RECIPIENT).filter(|value| !value.trim().is_empty())
        {
            config.recipient = recipient.trim().to_string();
        }
        config.outbox = lookup(env::ALERT_OUTBOX)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        config
    }

    /// Enable or disable alerting.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the outbox directory for spooled alerts.
    pub fn with_outbox(mut self, outbox: impl Into<PathBuf>) -> Self {
        self.outbox = Some(outbox.into());
        self
    }
}

/// Top-level pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Directory holding `<source_id>_processed_data.json` files.
    pub data_dir: PathBuf,
    /// Fall back to processing raw dumps when a processed dataset is missing.
    pub raw_fallback: bool,
    /// Max scored records retained across passes (0 disables caching).
    pub score_cache_capacity: usize,
    /// Sentiment scorer settings.
    pub scorer: ScorerConfig,
    /// Isolation forest settings.
    pub detector: DetectorConfig,
    /// Alert delivery settings.
    pub alerts: AlertConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            raw_fallback: false,
            score_cache_capacity: 10_000,
            scorer: ScorerConfig::default(),
            detector: DetectorConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup(env::DATA_DIR).filter(|value| !value.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        config.alerts = AlertConfig::from_lookup(lookup);
        config
    }

    /// Override the data directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Override the score-cache capacity.
    pub fn with_score_cache_capacity(mut self, capacity: usize) -> Self {
        self.score_cache_capacity = capacity;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
