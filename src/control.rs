//! Cancellation and progress hooks for long pipeline passes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::PipelineError;

/// Shared flag a caller flips to abandon an in-flight pass.
///
/// Clones share the same flag; the pipeline checks it between records and
/// between stages.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create an un-cancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request so the flag can be reused for the next pass.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// True once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Progress snapshot reported while scoring a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoringProgress {
    /// Records scored so far, cached ones included.
    pub scored: usize,
    /// Records in the batch.
    pub total: usize,
    /// Records served from the score cache so far.
    pub cached: usize,
}

/// Callback invoked with scoring progress.
pub type ProgressFn = Arc<dyn Fn(ScoringProgress) + Send + Sync + 'static>;

/// Per-pass control hooks. The default never cancels and reports nothing.
#[derive(Clone, Default)]
pub struct PassControl {
    cancel: Option<CancelFlag>,
    progress: Option<ProgressFn>,
}

impl PassControl {
    /// Control with neither cancellation nor progress reporting.
    pub fn none() -> Self {
        Self::default()
    }

    /// Attach a cancellation flag.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Fail with `Cancelled` if cancellation was requested.
    pub fn checkpoint(&self, stage: &'static str) -> Result<(), PipelineError> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => Err(PipelineError::Cancelled { stage }),
            _ => Ok(()),
        }
    }

    /// Control whose progress reports count `cached` records as already scored.
    pub fn offset_by_cached(&self, cached: usize) -> Self {
        let progress = self.progress.clone().map(|inner| -> ProgressFn {
            Arc::new(move |progress: ScoringProgress| {
                inner(ScoringProgress {
                    scored: progress.scored + cached,
                    total: progress.total + cached,
                    cached: progress.cached + cached,
                })
            })
        });
        Self {
            cancel: self.cancel.clone(),
            progress,
        }
    }

    /// Forward a progress snapshot to the callback, if any.
    pub fn report(&self, progress: ScoringProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

impl fmt::Debug for PassControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassControl")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn checkpoint_fails_only_after_cancel() {
        let flag = CancelFlag::new();
        let control = PassControl::none().with_cancel(flag.clone());
        assert!(control.checkpoint("scoring").is_ok());
        flag.cancel();
        match control.checkpoint("scoring") {
            Err(PipelineError::Cancelled { stage }) => assert_eq!(stage, "scoring"),
            other => panic!("unexpected result: {other:?}"),
        }
        flag.reset();
        assert!(control.checkpoint("scoring").is_ok());
    }

    #[test]
    fn report_forwards_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let control = PassControl::none().with_progress(Arc::new(move |progress| {
            sink.lock().unwrap().push(progress);
        }));
        control.report(ScoringProgress {
            scored: 1,
            total: 2,
            cached: 0,
        });
        assert_eq!(seen.lock().unwrap().len(), 1);

        control.offset_by_cached(4).report(ScoringProgress {
            scored: 1,
            total: 2,
            cached: 0,
        });
        assert_eq!(
            seen.lock().unwrap()[1],
            ScoringProgress {
                scored: 5,
                total: 6,
                cached: 4,
            }
        );
        PassControl::none().report(ScoringProgress {
            scored: 1,
            total: 1,
            cached: 1,
        });
    }
}
