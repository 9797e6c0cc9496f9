//! CSS-like text shadows: `"<offset-x> <offset-y> [<blur>] [<color>]"`.

use crate::animation::keyframes::sample_with;
use crate::foundation::math::{lerp, parse_leading_f64};
use crate::model::color::Rgba;
use crate::preset::model::Scalar;

/// Color used when a shadow omits one.
pub const DEFAULT_SHADOW_COLOR: Rgba = Rgba::rgba(0.0, 0.0, 0.0, 0.5);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSpec {
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    pub color: Rgba,
}

impl ShadowSpec {
    /// Parse one shadow. `none` and strings with fewer than two lengths yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return None;
        }

        let mut lengths = Vec::with_capacity(3);
        let mut color_parts = Vec::new();
        for token in split_top_level(s) {
            let numeric = !token.starts_with('#') && lengths.len() < 3;
            match parse_leading_f64(token).filter(|_| numeric) {
                Some(v) => lengths.push(v),
                None => color_parts.push(token),
            }
        }
        if lengths.len() < 2 {
            return None;
        }

        let color = if color_parts.is_empty() {
            DEFAULT_SHADOW_COLOR
        } else {
            Rgba::parse_or(&color_parts.join(" "), DEFAULT_SHADOW_COLOR)
        };
        Some(Self {
            offset_x: lengths[0],
            offset_y: lengths[1],
            blur: lengths.get(2).copied().unwrap_or(0.0).max(0.0),
            color,
        })
    }

    /// Same geometry with a fully transparent color, used to fade a shadow in or out.
    pub fn cleared(self) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            blur: 0.0,
            color: self.color.fade(0.0),
        }
    }

    /// Componentwise blend; colors blend linearly in straight RGBA.
    pub fn lerp(self, to: ShadowSpec, t: f64) -> ShadowSpec {
        ShadowSpec {
            offset_x: lerp(self.offset_x, to.offset_x, t),
            offset_y: lerp(self.offset_y, to.offset_y, t),
            blur: lerp(self.blur, to.blur, t).max(0.0),
            color: self.color.lerp(to.color, t),
        }
    }

    /// Blend where either side may be absent; a missing side is the other one, cleared.
    pub fn lerp_opt(from: Option<ShadowSpec>, to: Option<ShadowSpec>, t: f64) -> Option<ShadowSpec> {
        match (from, to) {
            (None, None) => None,
            (Some(a), None) => Some(a.lerp(a.cleared(), t)),
            (None, Some(b)) => Some(b.cleared().lerp(b, t)),
            (Some(a), Some(b)) => Some(a.lerp(b, t)),
        }
    }

    /// A shadow that draws nothing.
    pub fn is_invisible(&self) -> bool {
        self.color.is_transparent()
    }
}

/// Sample a shadow track at `t`. Unparsable stops count as cleared shadows.
pub fn resolve(stops: &[Scalar], t: f64) -> Option<ShadowSpec> {
    let parsed: Vec<Option<ShadowSpec>> = stops
        .iter()
        .map(|s| s.text().and_then(ShadowSpec::parse))
        .collect();
    if parsed.iter().all(Option::is_none) {
        return None;
    }
    sample_with(&parsed, t, |a, b, k| ShadowSpec::lerp_opt(*a, *b, k)).flatten()
}

/// Split on whitespace outside parentheses, so `rgba(0, 0, 0, 0.5)` stays one token.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if let Some(st) = start.take() {
                    out.push(&s[st..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(st) = start {
        out.push(&s[st..]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/animation/shadow.rs"]
mod tests;
