//! Parallel render coordinator.
//!
//! The frame range is split into contiguous sub-ranges, one per render unit. Units stream
//! frames back over a bounded channel; the coordinator, on the caller's thread, reorders them
//! and pushes them into the sink strictly in frame order. When a unit fails the remaining
//! frames are rendered sequentially instead, so the output is always complete.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, sync_channel};
use std::time::Duration;

use crate::encode::sink::{FrameSink, SinkReady};
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::progress::{ProgressReporter, ProgressSink};
use crate::pipeline::worker::{FrameJob, RendererFactory, UnitMessage, run_unit};
use crate::render::frame::FrameRGBA;

/// Frames per unit used to size the unit count.
pub const FRAMES_PER_UNIT: u64 = 30;

/// Lifecycle of one coordinated render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Spawning,
    Streaming,
    Draining,
    Failed,
    Fallback,
    Done,
    Cancelled,
}

/// Counters of a finished render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_total: u64,
    pub frames_rendered: u64,
    pub frames_reused: u64,
    pub workers: usize,
    pub fell_back: bool,
}

/// Tuning and control for [`Coordinator::run`].
#[derive(Clone)]
pub struct CoordinatorOptions {
    /// Upper bound on render units; `None` uses the available parallelism.
    pub max_workers: Option<usize>,
    /// Frames per spawn round; `None` renders everything in one round.
    pub batch_frames: Option<u64>,
    /// Capacity of the unit-to-coordinator channel, in messages.
    pub channel_capacity: usize,
    /// How often the coordinator wakes to check for cancellation.
    pub poll_interval: Duration,
    pub progress: Option<Arc<dyn ProgressSink>>,
    pub progress_step_percent: f64,
    pub cancel: CancelToken,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            max_workers: None,
            batch_frames: None,
            channel_capacity: 16,
            poll_interval: Duration::from_millis(50),
            progress: None,
            progress_step_percent: 1.0,
            cancel: CancelToken::new(),
        }
    }
}

impl std::fmt::Debug for CoordinatorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorOptions")
            .field("max_workers", &self.max_workers)
            .field("batch_frames", &self.batch_frames)
            .field("channel_capacity", &self.channel_capacity)
            .field("poll_interval", &self.poll_interval)
            .field("progress", &self.progress.is_some())
            .field("progress_step_percent", &self.progress_step_percent)
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// `clamp(ceil(total / 30), 1, min(available, max_workers))`.
pub fn worker_count(total_frames: u64, available: usize, max_workers: Option<usize>) -> usize {
    let cap = max_workers.map_or(available, |m| m.min(available)).max(1);
    let wanted = total_frames.div_ceil(FRAMES_PER_UNIT).max(1);
    usize::try_from(wanted).unwrap_or(usize::MAX).clamp(1, cap)
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

fn build_thread_pool(threads: usize) -> CaptionResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(CaptionError::validation("render units must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("captionflow-unit-{i}"))
        .build()
        .map_err(|e| CaptionError::worker(format!("failed to build rayon thread pool: {e}")))
}

fn batches(total: u64, batch_frames: Option<u64>) -> Vec<FrameRange> {
    let size = batch_frames.filter(|&n| n > 0).unwrap_or(total).max(1);
    let mut out = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + size).min(total);
        out.push(FrameRange {
            start: FrameIndex(start),
            end: FrameIndex(end),
        });
        start = end;
    }
    out
}

/// Why streaming stopped before the round completed.
enum Interrupt {
    UnitFailed {
        unit: usize,
        frame: Option<u64>,
        message: String,
    },
    Cancelled,
    Fatal(CaptionError),
}

impl Interrupt {
    fn into_error(self) -> CaptionError {
        match self {
            Self::UnitFailed {
                unit,
                frame,
                message,
            } => CaptionError::worker(match frame {
                Some(f) => format!("unit {unit} failed at frame {f}: {message}"),
                None => format!("unit {unit} failed: {message}"),
            }),
            Self::Cancelled => CaptionError::Cancelled,
            Self::Fatal(e) => e,
        }
    }
}

impl From<CaptionError> for Interrupt {
    fn from(e: CaptionError) -> Self {
        if e.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Fatal(e)
        }
    }
}

/// Ordered delivery into the sink: reorder buffer, flush cursor and backpressure.
struct Delivery<'s> {
    sink: &'s mut dyn FrameSink,
    pending: BTreeMap<u64, (FrameRGBA, bool)>,
    next_flush: u64,
    awaiting_ready: bool,
    progress: ProgressReporter,
    stats: RenderStats,
}

impl Delivery<'_> {
    fn accept(&mut self, index: u64, frame: FrameRGBA, reused: bool) -> CaptionResult<()> {
        if index < self.next_flush || self.pending.insert(index, (frame, reused)).is_some() {
            return Err(CaptionError::worker(format!("frame {index} delivered twice")));
        }
        while let Some((frame, reused)) = self.pending.remove(&self.next_flush) {
            self.push(frame, reused)?;
        }
        Ok(())
    }

    fn push(&mut self, frame: FrameRGBA, reused: bool) -> CaptionResult<()> {
        if self.awaiting_ready {
            self.sink.wait_ready()?;
            self.awaiting_ready = false;
        }
        let index = FrameIndex(self.next_flush);
        if self.sink.push_frame(index, frame)? == SinkReady::Busy {
            self.awaiting_ready = true;
        }
        self.next_flush += 1;
        if reused {
            self.stats.frames_reused += 1;
        } else {
            self.stats.frames_rendered += 1;
        }
        self.progress.frames_flushed(self.next_flush);
        Ok(())
    }

    fn settle(&mut self) -> CaptionResult<()> {
        if self.awaiting_ready {
            self.sink.wait_ready()?;
            self.awaiting_ready = false;
        }
        Ok(())
    }
}

/// Drives render units and a sink through one render.
pub struct Coordinator {
    factory: Arc<dyn RendererFactory>,
    options: CoordinatorOptions,
    state: CoordinatorState,
}

impl Coordinator {
    pub fn new(factory: Arc<dyn RendererFactory>, options: CoordinatorOptions) -> Self {
        Self {
            factory,
            options,
            state: CoordinatorState::Idle,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    fn transition(&mut self, to: CoordinatorState) {
        match to {
            CoordinatorState::Failed | CoordinatorState::Fallback | CoordinatorState::Cancelled => {
                tracing::warn!(from = ?self.state, to = ?to, "coordinator state")
            }
            _ => tracing::debug!(from = ?self.state, to = ?to, "coordinator state"),
        }
        self.state = to;
    }

    /// Render frames `[0, total_frames)` into `sink`.
    ///
    /// `sink.end()` is called once after the last frame; on error or cancellation the sink is
    /// aborted instead.
    #[tracing::instrument(
        skip_all,
        fields(total_frames = total_frames, width = canvas.width, height = canvas.height)
    )]
    pub fn run(
        &mut self,
        sink: &mut dyn FrameSink,
        canvas: Canvas,
        fps: Fps,
        total_frames: u64,
    ) -> CaptionResult<RenderStats> {
        if self.state != CoordinatorState::Idle {
            return Err(CaptionError::validation("coordinator already ran"));
        }
        if self.options.cancel.is_cancelled() {
            self.transition(CoordinatorState::Cancelled);
            return Err(CaptionError::Cancelled);
        }
        let progress = match self.options.progress.clone() {
            Some(p) => ProgressReporter::spawn(p, total_frames, self.options.progress_step_percent)?,
            None => ProgressReporter::disabled(total_frames),
        };

        self.transition(CoordinatorState::Spawning);
        let workers = worker_count(total_frames, available_parallelism(), self.options.max_workers);
        tracing::info!(workers, total_frames, "starting render units");
        if let Err(e) = sink.begin(canvas, fps, total_frames) {
            self.transition(CoordinatorState::Failed);
            return Err(e);
        }

        let mut delivery = Delivery {
            sink,
            pending: BTreeMap::new(),
            next_flush: 0,
            awaiting_ready: false,
            progress,
            stats: RenderStats {
                frames_total: total_frames,
                workers,
                ..RenderStats::default()
            },
        };

        match self.stream_all(&mut delivery, canvas, fps, total_frames, workers) {
            Ok(()) => {}
            Err(Interrupt::Cancelled) => {
                self.transition(CoordinatorState::Cancelled);
                delivery.sink.abort();
                return Err(CaptionError::Cancelled);
            }
            Err(interrupt) => {
                self.transition(CoordinatorState::Failed);
                delivery.sink.abort();
                return Err(interrupt.into_error());
            }
        }

        self.transition(CoordinatorState::Draining);
        let finished = delivery.settle().and_then(|()| delivery.sink.end());
        if let Err(e) = finished {
            self.transition(CoordinatorState::Failed);
            delivery.sink.abort();
            return Err(e);
        }
        let Delivery {
            progress, stats, ..
        } = delivery;
        progress.finish();
        self.transition(CoordinatorState::Done);
        tracing::info!(
            rendered = stats.frames_rendered,
            reused = stats.frames_reused,
            fell_back = stats.fell_back,
            "render finished"
        );
        Ok(stats)
    }

    fn stream_all(
        &mut self,
        delivery: &mut Delivery<'_>,
        canvas: Canvas,
        fps: Fps,
        total: u64,
        workers: usize,
    ) -> Result<(), Interrupt> {
        let pool = build_thread_pool(workers)?;
        for batch in batches(total, self.options.batch_frames) {
            match self.stream_batch(&pool, delivery, batch, canvas, fps, workers) {
                Ok(()) => {}
                Err(Interrupt::UnitFailed {
                    unit,
                    frame,
                    message,
                }) => {
                    self.transition(CoordinatorState::Failed);
                    tracing::warn!(unit, ?frame, %message, "render unit failed, falling back");
                    delivery.pending.clear();
                    return self.fallback(delivery, canvas, fps, total);
                }
                Err(other) => return Err(other),
            }
        }
        if delivery.next_flush != total {
            return Err(Interrupt::Fatal(CaptionError::worker(format!(
                "render ended at frame {} of {total}",
                delivery.next_flush
            ))));
        }
        Ok(())
    }

    fn stream_batch(
        &mut self,
        pool: &rayon::ThreadPool,
        delivery: &mut Delivery<'_>,
        batch: FrameRange,
        canvas: Canvas,
        fps: Fps,
        workers: usize,
    ) -> Result<(), Interrupt> {
        let ranges = batch.split_even(workers);
        let units = ranges.len();
        let (tx, rx) = sync_channel(self.options.channel_capacity.max(units));
        let stop = Arc::new(AtomicBool::new(false));
        for (unit, range) in ranges.into_iter().enumerate() {
            let job = FrameJob { range, fps, canvas };
            let factory = Arc::clone(&self.factory);
            let tx = tx.clone();
            let stop = Arc::clone(&stop);
            pool.spawn(move || run_unit(unit, job, factory, tx, stop));
        }
        drop(tx);
        self.transition(CoordinatorState::Streaming);

        let mut live = units;
        let result = self.receive(delivery, &rx, &mut live);
        if result.is_err() {
            stop.store(true, Ordering::SeqCst);
            drain(&rx, live);
        }
        result
    }

    fn receive(
        &self,
        delivery: &mut Delivery<'_>,
        rx: &Receiver<UnitMessage>,
        live: &mut usize,
    ) -> Result<(), Interrupt> {
        while *live > 0 {
            if self.options.cancel.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
            match rx.recv_timeout(self.options.poll_interval) {
                Ok(UnitMessage::Frame {
                    index,
                    frame,
                    reused,
                }) => delivery.accept(index, frame, reused)?,
                Ok(UnitMessage::Done { unit }) => {
                    *live -= 1;
                    tracing::debug!(unit, "render unit done");
                }
                Ok(UnitMessage::Failed {
                    unit,
                    frame,
                    message,
                }) => {
                    *live -= 1;
                    return Err(Interrupt::UnitFailed {
                        unit,
                        frame,
                        message,
                    });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Interrupt::Fatal(CaptionError::worker(
                        "render units disconnected without finishing",
                    )));
                }
            }
        }
        Ok(())
    }

    /// Render `[next_flush, total)` on the caller's thread with a fresh renderer.
    fn fallback(
        &mut self,
        delivery: &mut Delivery<'_>,
        canvas: Canvas,
        fps: Fps,
        total: u64,
    ) -> Result<(), Interrupt> {
        self.transition(CoordinatorState::Fallback);
        delivery.stats.fell_back = true;
        let start = delivery.next_flush;
        tracing::warn!(from_frame = start, total, "rendering remaining frames sequentially");

        let mut renderer = self.factory.create(canvas, fps).map_err(|e| {
            Interrupt::Fatal(CaptionError::worker(format!(
                "fallback renderer could not be created: {e}"
            )))
        })?;
        for index in (start..total).map(FrameIndex) {
            if self.options.cancel.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
            let rendered = catch_unwind(AssertUnwindSafe(|| {
                renderer.render_frame(index, fps.frame_time(index))
            }))
            .unwrap_or_else(|_| Err(CaptionError::worker("renderer panicked")))
            .map_err(|e| {
                Interrupt::Fatal(CaptionError::worker(format!(
                    "fallback render failed at frame {}: {e}",
                    index.0
                )))
            })?;
            delivery.accept(index.0, rendered.frame, rendered.reused)?;
        }
        Ok(())
    }
}

/// Discard traffic until every live unit has reported its terminal message.
fn drain(rx: &Receiver<UnitMessage>, mut live: usize) {
    while live > 0 {
        match rx.recv() {
            Ok(UnitMessage::Done { .. } | UnitMessage::Failed { .. }) => live -= 1,
            Ok(UnitMessage::Frame { .. }) => {}
            Err(_) => break,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/coordinator.rs"]
mod tests;
