//! Effect presets and the embedded catalog.

pub mod catalog;
pub mod model;

pub use catalog::PresetCatalog;
pub use model::EffectPreset;
