//! CPU caption rendering: surfaces, layout, the rasterizer and frame reuse.

pub mod blur;
pub mod cache;
pub mod composite;
pub mod decor;
pub mod frame;
pub mod layout;
pub mod raster;
pub mod surface;

pub use cache::{FrameCacheGuard, cache_key};
pub use frame::FrameRGBA;
pub use raster::{CueMode, CuePlan, Rasterizer};
pub use surface::{LayerStyle, Surface};
