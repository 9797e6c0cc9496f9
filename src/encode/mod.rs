//! Frame sinks: the backpressure contract, an in-memory sink and the ffmpeg overlay encoder.

pub mod ffmpeg;
pub mod probe;
pub mod sink;

pub use ffmpeg::{EncoderOptions, FfmpegOverlaySink};
pub use probe::{VideoInfo, probe};
pub use sink::{FrameSink, InMemorySink, SinkReady};
