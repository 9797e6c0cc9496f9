//! Frame consumers with backpressure.

use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::render::frame::FrameRGBA;

/// Whether a sink can take the next frame right away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkReady {
    Ready,
    /// The frame was accepted but is parked; call [`FrameSink::wait_ready`] before the next
    /// push.
    Busy,
}

/// Ordered consumer of rendered frames.
///
/// Frames arrive in ascending index order, starting at 0. `end` is called once after the last
/// frame; `abort` replaces it when the render stops early.
pub trait FrameSink: Send {
    fn begin(&mut self, canvas: Canvas, fps: Fps, total_frames: u64) -> CaptionResult<()>;

    fn push_frame(&mut self, index: FrameIndex, frame: FrameRGBA) -> CaptionResult<SinkReady>;

    /// Block until a parked frame has been taken.
    fn wait_ready(&mut self) -> CaptionResult<()>;

    fn end(&mut self) -> CaptionResult<()>;

    /// Stop without finalizing the output.
    fn abort(&mut self);
}

/// Sink that keeps every frame in memory. Used by tests and single-frame exports.
///
/// It rejects out-of-order pushes, can pretend to be busy every `n` frames and can fail on a
/// chosen frame.
#[derive(Debug, Default)]
pub struct InMemorySink {
    frames: Vec<(FrameIndex, FrameRGBA)>,
    expected_total: Option<u64>,
    busy_every: Option<u64>,
    fail_at: Option<u64>,
    parked: bool,
    waits: u64,
    begun: bool,
    ended: bool,
    aborted: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report [`SinkReady::Busy`] after every `n`-th frame.
    pub fn busy_every(mut self, n: u64) -> Self {
        self.busy_every = (n > 0).then_some(n);
        self
    }

    /// Fail the push of frame `index`.
    pub fn fail_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<FrameRGBA> {
        self.frames.into_iter().map(|(_, f)| f).collect()
    }

    /// Number of `wait_ready` calls that released a parked frame.
    pub fn waits(&self) -> u64 {
        self.waits
    }

    pub fn is_begun(&self) -> bool {
        self.begun
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, _canvas: Canvas, _fps: Fps, total_frames: u64) -> CaptionResult<()> {
        self.begun = true;
        self.expected_total = Some(total_frames);
        Ok(())
    }

    fn push_frame(&mut self, index: FrameIndex, frame: FrameRGBA) -> CaptionResult<SinkReady> {
        if !self.begun || self.ended || self.aborted {
            return Err(CaptionError::sink("push_frame", Some(index.0), "sink is not open"));
        }
        if self.parked {
            return Err(CaptionError::sink(
                "push_frame",
                Some(index.0),
                "push while busy; wait_ready was not called",
            ));
        }
        if self.fail_at == Some(index.0) {
            return Err(CaptionError::sink("push_frame", Some(index.0), "injected failure"));
        }
        let expected = self.frames.len() as u64;
        if index.0 != expected {
            return Err(CaptionError::sink(
                "push_frame",
                Some(index.0),
                format!("out of order, expected frame {expected}"),
            ));
        }
        self.frames.push((index, frame));

        let busy = self
            .busy_every
            .is_some_and(|n| (self.frames.len() as u64).is_multiple_of(n));
        if busy {
            self.parked = true;
            Ok(SinkReady::Busy)
        } else {
            Ok(SinkReady::Ready)
        }
    }

    fn wait_ready(&mut self) -> CaptionResult<()> {
        if self.parked {
            self.parked = false;
            self.waits += 1;
        }
        Ok(())
    }

    fn end(&mut self) -> CaptionResult<()> {
        if let Some(total) = self.expected_total {
            if total != self.frames.len() as u64 {
                return Err(CaptionError::sink(
                    "end",
                    None,
                    format!("received {} of {total} frames", self.frames.len()),
                ));
            }
        }
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
