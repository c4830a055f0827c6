/// Field names and labels used by the record normalizer.
pub mod normalizer {
    /// Primary timestamp column in news datasets.
    pub const NEWS_TIMESTAMP_FIELD: &str = "publishedAt";
    /// Primary timestamp column in social datasets.
    pub const SOCIAL_TIMESTAMP_FIELD: &str = "posted";
    /// Fallback timestamp column shared by preprocessed datasets.
    pub const FALLBACK_TIMESTAMP_FIELD: &str = "timestamp";
    /// Long-form description column (news).
    pub const DESCRIPTION_FIELD: &str = "description";
    /// Headline column combined with the description.
    pub const TITLE_FIELD: &str = "title";
    /// Body column used when no description is present (social).
    pub const TEXT_FIELD: &str = "text";
    /// Link column carried through for display.
    pub const URL_FIELD: &str = "url";
    /// Separator placed between title and description.
    pub const TITLE_DESCRIPTION_SEPARATOR: &str = " ";
}

/// Dataset identifiers and file layout shared by sources and transports.
pub mod datasets {
    /// Dataset id for the news source.
    pub const NEWS_SOURCE_ID: &str = "google_news";
    /// Dataset id for the social source.
    pub const SOCIAL_SOURCE_ID: &str = "social_searcher";
    /// Suffix of preprocessed dataset files (`<source_id>_processed_data.json`).
    pub const PROCESSED_FILE_SUFFIX: &str = "_processed_data.json";
    /// Suffix of raw acquisition dumps (`<source_id>_data.json`).
    pub const RAW_FILE_SUFFIX: &str = "_data.json";
    /// Envelope key holding news articles in raw dumps.
    pub const NEWS_ENVELOPE_KEY: &str = "articles";
    /// Envelope key holding social posts in raw dumps.
    pub const SOCIAL_ENVELOPE_KEY: &str = "posts";
    /// Separator used when flattening nested raw objects (`source.name`).
    pub const NESTED_FIELD_SEPARATOR: &str = ".";
    /// Default data directory used when no override is configured.
    pub const DEFAULT_DATA_DIR: &str = "data";
}

/// Constants used by the sentiment scorer.
pub mod scorer {
    /// Score reported for inputs the model cannot classify.
    pub const FALLBACK_SCORE: f64 = 0.0;
    /// Confidence reported by the lexicon model when no cue words match.
    pub const NO_SIGNAL_CONFIDENCE: f64 = 0.5;
    /// Records scored between progress log lines for large batches.
    pub const PROGRESS_LOG_EVERY: usize = 500;
    /// Batch size above which scoring progress is logged.
    pub const PROGRESS_LOG_MIN_BATCH: usize = 1_000;
}

/// Constants used by the isolation forest anomaly detector.
pub mod detector {
    /// Working sets smaller than this are never analysed.
    pub const MIN_WORKING_SET: usize = 10;
    /// Expected fraction of anomalous records.
    pub const CONTAMINATION: f64 = 0.05;
    /// Seed that keeps detection reproducible on identical input.
    pub const SEED: u64 = 42;
    /// Trees in the forest.
    pub const N_ESTIMATORS: usize = 100;
    /// Upper bound on the subsample drawn for each tree.
    pub const MAX_SAMPLES: usize = 256;
    /// Euler–Mascheroni constant used by the average path length correction.
    pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
    /// Minimum feature spread a node needs before it is split.
    pub const MIN_SPLIT_SPREAD: f64 = 1e-12;
}

/// Constants used by the alert dispatcher.
pub mod alert {
    /// Subject line of every anomaly alert.
    pub const SUBJECT: &str = "Sentiment Alert";
    /// Body of every anomaly alert.
    pub const MESSAGE: &str = "Unusual sentiment trend detected!";
    /// Placeholder sender used when none is configured.
    pub const DEFAULT_SENDER: &str = "alerts@localhost";
    /// Placeholder recipient used when none is configured.
    pub const DEFAULT_RECIPIENT: &str = "analyst@localhost";
}

/// Environment variable names read by configuration loaders.
pub mod env {
    /// Overrides the data directory.
    pub const DATA_DIR: &str = "SENTIMENT_WATCH_DATA_DIR";
    /// Enables/disables alerting (`0`, `false`, `off` disable).
    pub const ALERTS_ENABLED: &str = "SENTIMENT_WATCH_ALERTS";
    /// Alert sender address.
    pub const ALERT_SENDER: &str = "SENTIMENT_WATCH_ALERT_SENDER";
    /// Alert recipient address.
    pub const ALERT_RECIPIENT: &str = "SENTIMENT_WATCH_ALERT_RECIPIENT";
    /// Outbox directory for the file spool sink.
    pub const ALERT_OUTBOX: &str = "SENTIMENT_WATCH_ALERT_OUTBOX";
}

/// Constants used by dashboard aggregates.
pub mod metrics {
    /// Rolling window applied to the sentiment trend line.
    pub const TREND_WINDOW: usize = 5;
    /// Rows shown in the recent posts table.
    pub const RECENT_POSTS: usize = 10;
}

/// File layout and tokenizer limits for the ONNX classifier backend.
pub mod onnx {
    use crate::data::SentimentLabel;

    /// Exported classifier graph inside the model directory.
    pub const MODEL_FILE: &str = "model.onnx";
    /// WordPiece vocabulary inside the model directory.
    pub const VOCAB_FILE: &str = "vocab.txt";
    /// Sequence start token.
    pub const CLS_TOKEN: &str = "[CLS]";
    /// Sequence end token.
    pub const SEP_TOKEN: &str = "[SEP]";
    /// Out-of-vocabulary token.
    pub const UNK_TOKEN: &str = "[UNK]";
    /// Position embedding limit of BERT-family encoders.
    pub const MAX_SEQUENCE_LEN: usize = 512;
    /// Longer words are mapped straight to `[UNK]`.
    pub const MAX_WORD_CHARS: usize = 100;
    /// Class order of SST-2 fine-tuned checkpoints.
    pub const DEFAULT_LABELS: [SentimentLabel; 2] =
        [SentimentLabel::Negative, SentimentLabel::Positive];
}
