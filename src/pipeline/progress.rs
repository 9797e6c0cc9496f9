//! Throttled, monotonic progress delivery on a background thread.

use std::sync::Arc;
use std::sync::mpsc::{Sender, channel};
use std::thread::JoinHandle;

use crate::foundation::error::{CaptionError, CaptionResult};

/// Receiver of render progress in `[0, 1]`.
///
/// Called from a dedicated thread, never from the coordinator.
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, fraction: f64) {
        self(fraction)
    }
}

/// Highest value reported before the sink has finished.
pub const PROGRESS_CAP: f64 = 0.99;

/// Turns flushed-frame counts into throttled progress reports.
///
/// Values move in steps of `step_percent`, never decrease and stay at or below
/// [`PROGRESS_CAP`] until [`ProgressReporter::finish`] reports `1.0`.
pub struct ProgressReporter {
    tx: Option<Sender<f64>>,
    handle: Option<JoinHandle<()>>,
    total: u64,
    step: f64,
    last: f64,
}

impl ProgressReporter {
    /// Reporter that drops every update.
    pub fn disabled(total: u64) -> Self {
        Self {
            tx: None,
            handle: None,
            total,
            step: 0.01,
            last: 0.0,
        }
    }

    pub fn spawn(sink: Arc<dyn ProgressSink>, total: u64, step_percent: f64) -> CaptionResult<Self> {
        if !step_percent.is_finite() || step_percent <= 0.0 || step_percent > 100.0 {
            return Err(CaptionError::validation(
                "progress step must be in (0, 100] percent",
            ));
        }
        let (tx, rx) = channel::<f64>();
        let handle = std::thread::Builder::new()
            .name("captionflow-progress".to_owned())
            .spawn(move || {
                for fraction in rx {
                    sink.report(fraction);
                }
            })
            .map_err(|e| CaptionError::worker(format!("failed to spawn progress thread: {e}")))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            total,
            step: step_percent / 100.0,
            last: 0.0,
        })
    }

    /// Last value handed to the sink.
    pub fn last_reported(&self) -> f64 {
        self.last
    }

    /// `flushed` frames of `total` have reached the sink.
    pub fn frames_flushed(&mut self, flushed: u64) {
        if self.total == 0 {
            return;
        }
        let raw = (flushed as f64 / self.total as f64).min(PROGRESS_CAP);
        let stepped = ((raw / self.step) + 1e-9).floor() * self.step;
        let value = stepped.min(PROGRESS_CAP);
        if value > self.last {
            self.send(value);
        }
    }

    /// Report completion and wait for the delivery thread.
    pub fn finish(mut self) {
        self.send(1.0);
        self.shutdown();
    }

    fn send(&mut self, value: f64) {
        self.last = value;
        if let Some(tx) = self.tx.as_ref() {
            let _ = tx.send(value);
        }
    }

    fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(h) = self.handle.take()
            && h.join().is_err()
        {
            tracing::warn!("progress sink panicked");
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
