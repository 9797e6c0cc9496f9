//! Frame reuse between consecutive frames.
//!
//! A frame is identified by a string key built from the active cues, their effective style
//! and, only while something moves, the frame time. Two consecutive frames with equal keys
//! produce identical pixels, so the second shares the first one's buffer.

use std::fmt::Write as _;

use crate::foundation::core::Fps;
use crate::foundation::error::CaptionResult;
use crate::foundation::math::Fnv1a64;
use crate::model::cue::Cue;
use crate::model::style::Style;
use crate::preset::catalog::PresetCatalog;
use crate::render::frame::FrameRGBA;
use crate::render::layout::reference_font_px;
use crate::render::raster::cue_clock;

/// Key of the frame at `time` using the built-in preset catalog.
pub fn cache_key(cues: &[Cue], style: &Style, time: f64, fps: Fps) -> String {
    cache_key_with(PresetCatalog::builtin(), cues, style, time, fps)
}

/// Key of the frame at `time`.
///
/// Each active cue contributes its id, its text and a hash of its merged style. Cues in an
/// animated state add the frame number; the typing reveal adds its visible character count.
pub fn cache_key_with(
    catalog: &PresetCatalog,
    cues: &[Cue],
    style: &Style,
    time: f64,
    fps: Fps,
) -> String {
    let mut key = String::new();
    for cue in cues.iter().filter(|c| c.is_active_at(time)) {
        let merged = style.merged(cue.style_override.as_ref());
        let preset = catalog.lookup(&merged.effect);
        let clock = cue_clock(cue, &merged, preset, time, reference_font_px(&merged));

        let _ = write!(key, "{}|{:?}|{:016x}", cue.id, cue.text, style_hash(&merged));
        if clock.animating {
            let frame = (time * fps.as_f64()).round() as i64;
            let _ = write!(key, "|f{frame}");
        }
        if let Some(chars) = clock.visible_chars {
            let _ = write!(key, "|c{chars}");
        }
        key.push(';');
    }
    key
}

fn style_hash(style: &Style) -> u64 {
    let mut h = Fnv1a64::new_default();
    match serde_json::to_vec(style) {
        Ok(bytes) => h.write_bytes(&bytes),
        Err(e) => {
            tracing::debug!(error = %e, "style not serializable, hashing debug form");
            h.write_bytes(format!("{style:?}").as_bytes());
        }
    }
    h.finish()
}

/// Remembers the previous frame of one render unit.
#[derive(Debug, Default)]
pub struct FrameCacheGuard {
    last: Option<(String, FrameRGBA)>,
    hits: u64,
    misses: u64,
}

impl FrameCacheGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the previous frame when `key` matches it, else render a new one.
    ///
    /// The flag is `true` for a reused frame.
    pub fn render_or_reuse<F>(&mut self, key: String, render: F) -> CaptionResult<(FrameRGBA, bool)>
    where
        F: FnOnce() -> CaptionResult<FrameRGBA>,
    {
        if let Some((last_key, frame)) = self.last.as_ref() {
            if *last_key == key {
                self.hits += 1;
                return Ok((frame.clone(), true));
            }
        }
        let frame = render()?;
        self.misses += 1;
        self.last = Some((key, frame.clone()));
        Ok((frame, false))
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Forget the previous frame, so the next call renders.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cache.rs"]
mod tests;
