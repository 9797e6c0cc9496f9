//! Render entry points: resolve the output geometry, build the render units and stream the
//! captions into a sink.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::encode::ffmpeg::{EncoderOptions, FfmpegOverlaySink};
use crate::encode::probe::{VideoInfo, probe};
use crate::encode::sink::FrameSink;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::model::cue::Cue;
use crate::model::style::Style;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::coordinator::{Coordinator, CoordinatorOptions, RenderStats};
use crate::pipeline::progress::ProgressSink;
use crate::pipeline::worker::CaptionRendererFactory;
use crate::render::frame::FrameRGBA;
use crate::render::raster::Rasterizer;
use crate::render::surface::Surface;
use crate::text::fonts::FontBook;

/// Frame rate used when neither the caller nor the source provides one.
pub const DEFAULT_FPS: u32 = 60;

/// Named output sizes. Aspect presets and resolution tiers both map to fixed pixels;
/// `Original` keeps the probed size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FramePreset {
    Sd,
    Hd,
    Fhd,
    Uhd,
    Portrait,
    Square,
    Landscape,
    Original,
}

impl FramePreset {
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Sd => Some((854, 480)),
            Self::Hd => Some((1280, 720)),
            Self::Fhd | Self::Landscape => Some((1920, 1080)),
            Self::Uhd => Some((3840, 2160)),
            Self::Portrait => Some((1080, 1920)),
            Self::Square => Some((1080, 1080)),
            Self::Original => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sd => "sd",
            Self::Hd => "hd",
            Self::Fhd => "fhd",
            Self::Uhd => "uhd",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Original => "original",
        }
    }
}

impl FromStr for FramePreset {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "sd" | "480p" => Self::Sd,
            "hd" | "720p" => Self::Hd,
            "fhd" | "1080p" => Self::Fhd,
            "uhd" | "4k" | "2160p" => Self::Uhd,
            "9:16" | "portrait" => Self::Portrait,
            "1:1" | "square" => Self::Square,
            "16:9" | "landscape" => Self::Landscape,
            "original" => Self::Original,
            other => {
                return Err(CaptionError::validation(format!(
                    "unknown frame preset \"{other}\""
                )));
            }
        })
    }
}

impl TryFrom<String> for FramePreset {
    type Error = CaptionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FramePreset> for String {
    fn from(p: FramePreset) -> Self {
        p.name().to_owned()
    }
}

/// Caller options for [`render_animated_captions`]. Unset geometry is probed from the source.
#[derive(Clone, Default)]
pub struct RenderOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<Fps>,
    pub duration: Option<f64>,
    /// Overrides `width`/`height` when it names fixed dimensions.
    pub preset: Option<FramePreset>,
    pub workers: Option<usize>,
    pub batch_frames: Option<u64>,
    pub progress: Option<Arc<dyn ProgressSink>>,
    pub cancel: CancelToken,
    pub encoder: EncoderOptions,
    /// Explicit font files; take priority over `font_dir`.
    pub fonts: Vec<PathBuf>,
    pub font_dir: Option<PathBuf>,
    /// `ffprobe` binary; `None` uses the one on `PATH`.
    pub ffprobe: Option<PathBuf>,
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("fps", &self.fps)
            .field("duration", &self.duration)
            .field("preset", &self.preset)
            .field("workers", &self.workers)
            .field("batch_frames", &self.batch_frames)
            .field("progress", &self.progress.is_some())
            .field("encoder", &self.encoder)
            .field("fonts", &self.fonts)
            .field("font_dir", &self.font_dir)
            .finish_non_exhaustive()
    }
}

impl RenderOptions {
    fn needs_probe(&self) -> bool {
        let fixed = self.preset.and_then(FramePreset::dimensions).is_some()
            || (self.width.is_some() && self.height.is_some());
        !fixed || self.fps.is_none() || self.duration.is_none()
    }

    fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            max_workers: self.workers,
            batch_frames: self.batch_frames,
            progress: self.progress.clone(),
            cancel: self.cancel.clone(),
            ..CoordinatorOptions::default()
        }
    }
}

/// Output size, rate and length of a render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    pub canvas: Canvas,
    pub fps: Fps,
    pub duration: f64,
    pub total_frames: u64,
}

/// Fill in what `options` leaves open. `probe` is only called when something is missing.
pub fn resolve_geometry<P>(options: &RenderOptions, probe: P) -> CaptionResult<Geometry>
where
    P: FnOnce() -> CaptionResult<VideoInfo>,
{
    let probed = if options.needs_probe() {
        Some(probe()?)
    } else {
        None
    };

    let (width, height) = match options.preset.and_then(FramePreset::dimensions) {
        Some(dims) => dims,
        None => {
            let width = options.width.or(probed.as_ref().map(|p| p.width));
            let height = options.height.or(probed.as_ref().map(|p| p.height));
            width
                .zip(height)
                .ok_or_else(|| CaptionError::validation("could not determine output size"))?
        }
    };
    let canvas = Canvas::new(width, height)?;

    let fps = match options.fps.or(probed.as_ref().and_then(|p| p.fps)) {
        Some(fps) => fps,
        None => {
            tracing::debug!(fps = DEFAULT_FPS, "source has no frame rate, using default");
            Fps::new(DEFAULT_FPS, 1)?
        }
    };

    let duration = options
        .duration
        .or(probed.as_ref().and_then(|p| p.duration))
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| CaptionError::validation("could not determine video duration"))?;

    Ok(Geometry {
        canvas,
        fps,
        duration,
        total_frames: fps.frames_for_duration(duration),
    })
}

/// What a finished render produced.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderReport {
    pub output: PathBuf,
    pub geometry: Geometry,
    pub stats: RenderStats,
}

fn warn_degenerate(cues: &[Cue]) {
    let bad: Vec<String> = cues
        .iter()
        .filter(|c| c.is_degenerate())
        .map(|c| c.id.to_string())
        .collect();
    if !bad.is_empty() {
        tracing::warn!(cues = ?bad, "cues with end <= start never animate");
    }
}

/// Render the captions of `cues` over `geometry` into `sink`.
#[tracing::instrument(skip_all, fields(cues = cues.len(), total_frames = geometry.total_frames))]
pub fn render_captions_to_sink(
    sink: &mut dyn FrameSink,
    fonts: Arc<FontBook>,
    cues: &[Cue],
    style: &Style,
    geometry: Geometry,
    options: &RenderOptions,
) -> CaptionResult<RenderStats> {
    warn_degenerate(cues);
    let factory = CaptionRendererFactory::new(fonts, cues.into(), Arc::new(style.clone()));
    let mut coordinator = Coordinator::new(Arc::new(factory), options.coordinator_options());
    coordinator.run(sink, geometry.canvas, geometry.fps, geometry.total_frames)
}

/// Overlay animated captions on `source` and write the result to `output`.
#[tracing::instrument(skip_all, fields(source = %source.as_ref().display(), output = %output.as_ref().display()))]
pub fn render_animated_captions(
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    cues: &[Cue],
    style: &Style,
    options: &RenderOptions,
) -> CaptionResult<RenderReport> {
    let (source, output) = (source.as_ref(), output.as_ref());
    if !source.is_file() {
        return Err(CaptionError::validation(format!(
            "source video '{}' does not exist",
            source.display()
        )));
    }
    let ffprobe = options
        .ffprobe
        .clone()
        .unwrap_or_else(|| PathBuf::from("ffprobe"));
    let geometry = resolve_geometry(options, || probe(&ffprobe, source))?;
    tracing::info!(
        width = geometry.canvas.width,
        height = geometry.canvas.height,
        fps = geometry.fps.as_f64(),
        duration = geometry.duration,
        "render geometry"
    );

    let fonts = Arc::new(FontBook::discover(&options.fonts, options.font_dir.as_deref())?);
    let mut sink = FfmpegOverlaySink::new(source, output, options.encoder.clone());
    let stats = render_captions_to_sink(&mut sink, fonts, cues, style, geometry, options)?;
    Ok(RenderReport {
        output: output.to_path_buf(),
        geometry,
        stats,
    })
}

/// Render the single frame at `time`.
pub fn render_still(
    fonts: &FontBook,
    cues: &[Cue],
    style: &Style,
    canvas: Canvas,
    time: f64,
) -> CaptionResult<FrameRGBA> {
    let mut rasterizer = Rasterizer::new(fonts)?;
    let mut surface = Surface::new(canvas)?;
    let drawn = rasterizer.render(&mut surface, cues, style, time)?;
    tracing::debug!(drawn, time, "still rendered");
    Ok(surface.snapshot())
}

#[cfg(test)]
#[path = "../tests/unit/session/session.rs"]
mod tests;
