//! Pure animation resolution: easing, keyframes, motion state and text shadows.

pub mod ease;
pub mod keyframes;
pub mod motion;
pub mod shadow;

pub use ease::{Ease, SpringParams, spring};
pub use motion::{LineAnimation, MotionState, ResolvedMotion};
pub use shadow::ShadowSpec;
