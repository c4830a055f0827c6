//! Anomaly notifications.
//!
//! The dispatcher is edge-triggered per pass: every pass with at least one
//! anomaly sends exactly one message, with no de-duplication across passes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::AlertConfig;
use crate::constants::alert::{MESSAGE, SUBJECT};
use crate::errors::{AlertError, PipelineError};

/// Delivery channel for alert messages.
pub trait AlertSink: Send + Sync {
    /// Deliver one message.
    fn send(&self, subject: &str, message: &str) -> Result<(), AlertError>;
}

/// Sink that only emits a `tracing` event.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn send(&self, subject: &str, message: &str) -> Result<(), AlertError> {
        warn!(subject, message, "sentiment alert");
        Ok(())
    }
}

/// Sink that writes RFC 5322-style message files into an outbox directory
/// for an external mail agent to pick up.
#[derive(Debug)]
pub struct FileSpoolSink {
    outbox: PathBuf,
    sender: String,
    recipient: String,
    sequence: AtomicU64,
}

impl FileSpoolSink {
    /// Spool into `outbox` with the given envelope addresses.
    pub fn new(
        outbox: impl Into<PathBuf>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            outbox: outbox.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Directory receiving `.eml` files.
    pub fn outbox(&self) -> &Path {
        &self.outbox
    }

    fn render(&self, subject: &str, message: &str) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\n\r\n{}\r\n",
            self.sender,
            self.recipient,
            subject,
            Utc::now().to_rfc2822(),
            message
        )
    }
}

impl AlertSink for FileSpoolSink {
    fn send(&self, subject: &str, message: &str) -> Result<(), AlertError> {
        if self.recipient.trim().is_empty() {
            return Err(AlertError::Rejected("no recipient configured".into()));
        }
        fs::create_dir_all(&self.outbox)?;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{}-{:04}.eml",
            Utc::now().format("%Y%m%dT%H%M%S%.6f"),
            sequence
        );
        let path = self.outbox.join(name);
        fs::write(&path, self.render(subject, message))?;
        debug!(path = %path.display(), "spooled alert message");
        Ok(())
    }
}

/// Sends the fixed anomaly alert through an injected sink.
#[derive(Clone)]
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
    enabled: bool,
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(LogSink))
    }
}

impl AlertDispatcher {
    /// Enabled dispatcher over `sink`.
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self {
            sink,
            enabled: true,
        }
    }

    /// Build from configuration: a file spool when an outbox is set, else the log sink.
    pub fn from_config(config: &AlertConfig) -> Self {
        let sink: Arc<dyn AlertSink> = match &config.outbox {
            Some(outbox) => Arc::new(FileSpoolSink::new(
                outbox.clone(),
                config.sender.clone(),
                config.recipient.clone(),
            )),
            None => Arc::new(LogSink),
        };
        Self::new(sink).with_enabled(config.enabled)
    }

    /// Turn dispatch on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether anomalies reach the sink.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Send one alert when `anomaly_count > 0`; returns whether a message went out.
    pub fn dispatch(&self, anomaly_count: usize) -> Result<bool, PipelineError> {
        if anomaly_count == 0 {
            return Ok(false);
        }
        if !self.enabled {
            debug!(anomaly_count, "alerts disabled; skipping dispatch");
            return Ok(false);
        }
        self.sink.send(SUBJECT, MESSAGE)?;
        info!(anomaly_count, "sentiment alert dispatched");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl AlertSink for RecordingSink {
        fn send(&self, subject: &str, message: &str) -> Result<(), AlertError> {
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct FailingSink;

    impl AlertSink for FailingSink {
        fn send(&self, _subject: &str, _message: &str) -> Result<(), AlertError> {
            Err(AlertError::Transport("connection refused".into()))
        }
    }

    #[test]
    fn sends_fixed_message_once_when_anomalies_exist() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = AlertDispatcher::new(sink.clone());
        assert!(dispatcher.dispatch(3).unwrap());
        assert!(!dispatcher.dispatch(0).unwrap());
        let sent = sink.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![(
                "Sentiment Alert".to_string(),
                "Unusual sentiment trend detected!".to_string()
            )]
        );
    }

    #[test]
    fn disabled_dispatcher_never_calls_sink() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = AlertDispatcher::new(sink.clone()).with_enabled(false);
        assert!(!dispatcher.dispatch(5).unwrap());
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn transport_failure_becomes_recoverable_pipeline_error() {
        let err = AlertDispatcher::new(Arc::new(FailingSink))
            .dispatch(1)
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn file_spool_writes_one_message_per_send() {
        let dir = tempdir().unwrap();
        let outbox = dir.path().join("outbox");
        let config = AlertConfig::default().with_outbox(&outbox);
        let dispatcher = AlertDispatcher::from_config(&config);
        assert!(dispatcher.dispatch(1).unwrap());
        assert!(dispatcher.dispatch(2).unwrap());

        let mut files: Vec<PathBuf> = fs::read_dir(&outbox)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);
        let body = fs::read_to_string(&files[0]).unwrap();
        assert!(body.contains("Subject: Sentiment Alert"));
        assert!(body.contains("To: analyst@localhost"));
        assert!(body.contains("Unusual sentiment trend detected!"));
    }

    #[test]
    fn file_spool_rejects_blank_recipient() {
        let dir = tempdir().unwrap();
        let sink = FileSpoolSink::new(dir.path(), "a@b", " ");
        assert!(matches!(
            sink.send("s", "m"),
            Err(AlertError::Rejected(_))
        ));
    }
}
