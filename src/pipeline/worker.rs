//! Render units: per-unit renderers and the loop that feeds the coordinator.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;

use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
use crate::foundation::error::CaptionResult;
use crate::model::cue::Cue;
use crate::model::style::Style;
use crate::preset::catalog::PresetCatalog;
use crate::render::cache::{FrameCacheGuard, cache_key_with};
use crate::render::frame::FrameRGBA;
use crate::render::raster::Rasterizer;
use crate::render::surface::Surface;
use crate::text::fonts::FontBook;

/// Frames one unit is responsible for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameJob {
    pub range: FrameRange,
    pub fps: Fps,
    pub canvas: Canvas,
}

/// A rendered frame and whether it is the previous frame's buffer.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    pub frame: FrameRGBA,
    pub reused: bool,
}

/// Produces frames for one unit. Each unit owns its renderer; nothing is shared.
pub trait FrameRenderer {
    fn render_frame(&mut self, index: FrameIndex, time: f64) -> CaptionResult<RenderedFrame>;
}

/// Builds a fresh [`FrameRenderer`] for every unit, and for the sequential fallback.
pub trait RendererFactory: Send + Sync {
    fn create(&self, canvas: Canvas, fps: Fps) -> CaptionResult<Box<dyn FrameRenderer>>;
}

impl<F> RendererFactory for F
where
    F: Fn(Canvas, Fps) -> CaptionResult<Box<dyn FrameRenderer>> + Send + Sync,
{
    fn create(&self, canvas: Canvas, fps: Fps) -> CaptionResult<Box<dyn FrameRenderer>> {
        self(canvas, fps)
    }
}

/// Factory for caption renderers over one immutable cue list and style.
#[derive(Clone)]
pub struct CaptionRendererFactory {
    fonts: Arc<FontBook>,
    cues: Arc<[Cue]>,
    style: Arc<Style>,
    catalog: &'static PresetCatalog,
}

impl CaptionRendererFactory {
    pub fn new(fonts: Arc<FontBook>, cues: Arc<[Cue]>, style: Arc<Style>) -> Self {
        Self {
            fonts,
            cues,
            style,
            catalog: PresetCatalog::builtin(),
        }
    }

    pub fn with_catalog(mut self, catalog: &'static PresetCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Concrete renderer, for callers that want the cache counters.
    pub fn build(&self, canvas: Canvas, fps: Fps) -> CaptionResult<CaptionRenderer> {
        Ok(CaptionRenderer {
            rasterizer: Rasterizer::with_catalog(&self.fonts, self.catalog)?,
            surface: Surface::new(canvas)?,
            guard: FrameCacheGuard::new(),
            cues: Arc::clone(&self.cues),
            style: Arc::clone(&self.style),
            catalog: self.catalog,
            fps,
        })
    }
}

impl RendererFactory for CaptionRendererFactory {
    fn create(&self, canvas: Canvas, fps: Fps) -> CaptionResult<Box<dyn FrameRenderer>> {
        Ok(Box::new(self.build(canvas, fps)?))
    }
}

/// Rasterizer, scratch surface and frame cache of one unit.
pub struct CaptionRenderer {
    rasterizer: Rasterizer,
    surface: Surface,
    guard: FrameCacheGuard,
    cues: Arc<[Cue]>,
    style: Arc<Style>,
    catalog: &'static PresetCatalog,
    fps: Fps,
}

impl CaptionRenderer {
    pub fn cache_counters(&self) -> (u64, u64) {
        (self.guard.hits(), self.guard.misses())
    }
}

impl FrameRenderer for CaptionRenderer {
    fn render_frame(&mut self, _index: FrameIndex, time: f64) -> CaptionResult<RenderedFrame> {
        let key = cache_key_with(self.catalog, &self.cues, &self.style, time, self.fps);
        let (frame, reused) = self.guard.render_or_reuse(key, || {
            self.surface.clear();
            self.rasterizer
                .render(&mut self.surface, &self.cues, &self.style, time)?;
            Ok(self.surface.snapshot())
        })?;
        Ok(RenderedFrame { frame, reused })
    }
}

/// Traffic from units to the coordinator. Each unit ends with exactly one `Done` or `Failed`.
#[derive(Debug)]
pub enum UnitMessage {
    Frame {
        index: u64,
        frame: FrameRGBA,
        reused: bool,
    },
    Failed {
        unit: usize,
        frame: Option<u64>,
        message: String,
    },
    Done {
        unit: usize,
    },
}

/// Render `job.range` in ascending order and stream the frames to `tx`.
///
/// Stops early, reporting `Done`, once `stop` is set. Panics are caught and reported as
/// `Failed`.
pub fn run_unit(
    unit: usize,
    job: FrameJob,
    factory: Arc<dyn RendererFactory>,
    tx: SyncSender<UnitMessage>,
    stop: Arc<AtomicBool>,
) {
    let mut current = None;
    let outcome = catch_unwind(AssertUnwindSafe(|| -> CaptionResult<()> {
        let mut renderer = factory.create(job.canvas, job.fps)?;
        for index in job.range.iter() {
            if stop.load(Ordering::SeqCst) {
                break;
            }
            current = Some(index.0);
            let rendered = renderer.render_frame(index, job.fps.frame_time(index))?;
            let msg = UnitMessage::Frame {
                index: index.0,
                frame: rendered.frame,
                reused: rendered.reused,
            };
            if tx.send(msg).is_err() {
                break;
            }
        }
        Ok(())
    }));

    let terminal = match outcome {
        Ok(Ok(())) => UnitMessage::Done { unit },
        Ok(Err(e)) => UnitMessage::Failed {
            unit,
            frame: current,
            message: e.to_string(),
        },
        Err(panic) => UnitMessage::Failed {
            unit,
            frame: current,
            message: format!("unit panicked: {}", panic_message(panic.as_ref())),
        },
    };
    let _ = tx.send(terminal);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/worker.rs"]
mod tests;
