//! Parallel frame production: render units, the ordering coordinator, progress and
//! cancellation.

pub mod cancel;
pub mod coordinator;
pub mod progress;
pub mod worker;

pub use cancel::CancelToken;
pub use coordinator::{Coordinator, CoordinatorOptions, CoordinatorState, RenderStats};
pub use progress::{ProgressReporter, ProgressSink};
pub use worker::{CaptionRendererFactory, FrameJob, FrameRenderer, RenderedFrame, RendererFactory};
