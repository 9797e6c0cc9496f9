//! Fonts and shaping.

pub mod engine;
pub mod fonts;

pub use engine::{PlacedGlyph, ShapedLine, TextEngine};
pub use fonts::{FontBook, FontFace};
