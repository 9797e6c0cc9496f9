//! Caption inputs: timed cues, styles and colors.

pub mod color;
pub mod cue;
pub mod style;
