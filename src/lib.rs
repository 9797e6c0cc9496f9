#![forbid(unsafe_code)]

pub mod animation;
pub mod config;
pub mod encode;
pub mod foundation;
pub mod model;
pub mod pipeline;
pub mod preset;
pub mod render;
pub mod session;
pub mod text;

pub use config::{EnvOverrides, RenderJob};
pub use encode::{EncoderOptions, FfmpegOverlaySink, FrameSink, InMemorySink, SinkReady};
pub use foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
pub use foundation::error::{CaptionError, CaptionResult};
pub use model::color::Rgba;
pub use model::cue::{Cue, CueId, WordTiming};
pub use model::style::{Style, StyleOverride};
pub use pipeline::{CancelToken, CoordinatorOptions, ProgressSink, RenderStats};
pub use preset::{EffectPreset, PresetCatalog};
pub use render::{FrameRGBA, Rasterizer};
pub use session::{
    FramePreset, Geometry, RenderOptions, RenderReport, render_animated_captions,
    render_captions_to_sink, render_still,
};
pub use text::FontBook;
