//! Word-scope decorations: the migrating highlight, toggle decors and progress decors.
//!
//! Every decor is drawn in canvas coordinates around the word's resting box; the word's
//! transform is applied on top so decor follows word motion.

use std::sync::Arc;

use crate::animation::ease::{SpringParams, spring};
use crate::foundation::core::{Affine, BezPath, Point, Rect, Vec2};
use crate::foundation::error::CaptionResult;
use crate::foundation::math::{clamp01, lerp};
use crate::model::color::Rgba;
use crate::model::cue::WordTiming;
use crate::preset::model::{
    DecorToggleSpec, FillDirection, ProgressDecor, ProgressDecorSpec, ToggleDecor,
};
use crate::render::layout::{Metrics, WordBox, WordLayout};
use crate::render::surface::{Cap, Join, LayerStyle, Painter, Surface};
use crate::text::engine::ShapedLine;

/// Time the migrating highlight takes to move between words.
pub const MIGRATION_SECS: f64 = 0.18;
/// Critically damped spring for the highlight migration.
pub const MIGRATION_SPRING: SpringParams = SpringParams::new(4.0, 4.0, 1.0);
/// Spring that pops toggle decors in with the word's progress.
pub const DECOR_SPRING: SpringParams = SpringParams::new(350.0, 25.0, 1.0);
/// Default opacity multiplier for non-active words under `dimOthers`.
pub const DEFAULT_INACTIVE_OPACITY: f64 = 0.5;

/// Highlight shape shared by the active and previous word.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Highlight {
    pub rect: Rect,
    pub radius: f64,
    pub opacity: f64,
    pub color: Rgba,
}

/// Place the pill or box highlight between the previous and the active word.
///
/// The move starts at the active word's start and settles after [`MIGRATION_SECS`].
#[allow(clippy::too_many_arguments)]
pub fn migrating_highlight(
    layout: &WordLayout,
    timings: &[WordTiming],
    active: usize,
    time: f64,
    spec: &DecorToggleSpec,
    metrics: &Metrics,
    color: Rgba,
    opacity: f64,
) -> Option<Highlight> {
    let cur = layout.words.iter().find(|w| w.index == active)?;
    let prev = active
        .checked_sub(1)
        .and_then(|p| layout.words.iter().find(|w| w.index == p))
        .unwrap_or(cur);
    let start = timings.get(active).map_or(time, |w| w.start);

    let t = (time - start) / MIGRATION_SECS;
    let e = if t.is_nan() || t >= 1.0 {
        1.0
    } else {
        spring(t.max(0.0), MIGRATION_SPRING)
    };

    let center = Point::new(
        lerp(prev.center.x, cur.center.x, e),
        lerp(prev.center.y, cur.center.y, e),
    );
    let width = lerp(prev.width(), cur.width(), e);
    let pad_x = spec.padding_x.unwrap_or(0.0) * metrics.responsive;
    let pad_y = spec.padding_y.unwrap_or(0.0) * metrics.responsive;
    let height = metrics.font_px + 2.0 * pad_y;
    let rect = Rect::from_center_size(center, (width + 2.0 * pad_x, height));
    let radius = match spec.decor {
        ToggleDecor::PillBehind => height / 2.0,
        _ => spec.radius.unwrap_or(4.0) * metrics.responsive,
    };

    Some(Highlight {
        rect,
        radius,
        opacity: clamp01(spec.opacity.unwrap_or(1.0) * opacity),
        color,
    })
}

pub fn draw_highlight(surface: &mut Surface, h: &Highlight) -> CaptionResult<()> {
    surface.layer(LayerStyle::with_opacity(h.opacity as f32), |p| {
        p.fill_rounded_rect(h.rect, h.radius, h.color);
        Ok(())
    })
}

/// Inputs shared by every decor of one word.
#[derive(Clone, Debug)]
pub struct DecorContext<'a> {
    pub word: &'a WordBox,
    pub metrics: &'a Metrics,
    /// Word transform around its center.
    pub transform: Affine,
    pub color: Rgba,
    /// Word opacity the decor multiplies into.
    pub opacity: f64,
    /// Progress of the word in `[0, 1]`.
    pub progress: f64,
    /// Style highlight opacity.
    pub highlight_alpha: f64,
    /// Shaped quote mark, for the quotes decor.
    pub quote: Option<Arc<ShapedLine>>,
}

impl DecorContext<'_> {
    fn rect(&self) -> Rect {
        self.word.rect(self.metrics.font_px)
    }

    fn glyph_origin(&self) -> Point {
        let w = self.word;
        Point::new(
            w.center.x - w.width() / 2.0,
            w.center.y + w.shaped.middle_to_baseline(),
        )
    }

    fn scaled_about_center(&self, s: f64) -> Affine {
        let c = self.word.center.to_vec2();
        self.transform * Affine::translate(c) * Affine::scale(s) * Affine::translate(-c)
    }
}

/// Whether a toggle decor draws under the word's glyphs.
pub fn toggle_is_behind(decor: ToggleDecor) -> bool {
    matches!(
        decor,
        ToggleDecor::Halo
            | ToggleDecor::Tape
            | ToggleDecor::ShadowPop
            | ToggleDecor::Outline
            | ToggleDecor::BackdropBlurChip
    )
}

/// Draw a non-migrating toggle decor for the active word.
///
/// Opacity and scale follow `decorT = spring(progress)`: the decor fades in over the first
/// two thirds of the spring and grows from 80%.
pub fn draw_toggle_decor(
    surface: &mut Surface,
    spec: &DecorToggleSpec,
    cx: &DecorContext<'_>,
) -> CaptionResult<()> {
    if spec.decor.migrates() || spec.decor == ToggleDecor::DimOthers {
        return Ok(());
    }
    let t = spring(cx.progress, DECOR_SPRING);
    let opacity = cx.opacity
        * spec.opacity.unwrap_or(1.0)
        * cx.highlight_alpha
        * (t * 1.5).clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return Ok(());
    }
    let unit = cx.metrics.unit;
    let font = cx.metrics.font_px;
    let rect = cx.rect();
    let c = cx.word.center;
    let color = cx.color;
    let style = LayerStyle::with_opacity(opacity as f32);

    match spec.decor {
        ToggleDecor::Halo => {
            let padded = rect.inflate(
                spec.padding_x.unwrap_or(18.0) * unit,
                spec.padding_y.unwrap_or(10.0) * unit,
            );
            let radius = spec.radius.unwrap_or(999.0) * unit;
            let sigma = (spec.blur_px.unwrap_or(12.0) * unit / 2.0) as f32;
            let tf = cx.scaled_about_center(0.8 + 0.2 * t);
            surface.layer(style.blurred(sigma), |p| {
                p.set_transform(tf);
                p.fill_rounded_rect(padded, radius, color);
                Ok(())
            })
        }
        ToggleDecor::BackdropBlurChip => {
            let padded = rect.inflate(
                spec.padding_x.unwrap_or(14.0) * unit,
                spec.padding_y.unwrap_or(6.0) * unit,
            );
            let radius = spec.radius.unwrap_or(999.0) * unit;
            let sigma = (spec.blur_px.unwrap_or(10.0) * cx.metrics.responsive / 4.0) as f32;
            let tf = cx.scaled_about_center(0.8 + 0.2 * t);
            surface.layer(style.blurred(sigma), |p| {
                p.set_transform(tf);
                p.fill_rounded_rect(padded, radius, color);
                Ok(())
            })
        }
        ToggleDecor::Tape => {
            let padded = rect.inflate(
                spec.padding_x.unwrap_or(14.0) * unit,
                spec.padding_y.unwrap_or(6.0) * unit,
            );
            let radius = spec.radius.unwrap_or(8.0) * unit;
            let diagonal = spec.pattern.as_deref() == Some("diagonal");
            let tf = cx.scaled_about_center(0.8 + 0.2 * t)
                * Affine::translate(c.to_vec2())
                * Affine::rotate((-2.0f64).to_radians())
                * Affine::translate(-c.to_vec2());
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.fill_rounded_rect(padded, radius, color);
                if diagonal {
                    p.push_clip(padded);
                    stripes(p, padded, 6.0 * unit, Rgba::WHITE.fade(0.25));
                    p.pop_layer();
                }
                Ok(())
            })
        }
        ToggleDecor::ShadowPop => {
            let off = spec.size.unwrap_or(4.0) * unit * t;
            let tf = Affine::translate(Vec2::new(off, off)) * cx.transform;
            let origin = cx.glyph_origin();
            let shaped = Arc::clone(&cx.word.shaped);
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.fill_glyphs(&shaped, origin, color);
                Ok(())
            })
        }
        ToggleDecor::Outline => {
            let width = spec.stroke_width.unwrap_or(6.0) * unit * t;
            let origin = cx.glyph_origin();
            let shaped = Arc::clone(&cx.word.shaped);
            let tf = cx.transform;
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.stroke_glyphs(&shaped, origin, color, width, Join::Round);
                Ok(())
            })
        }
        ToggleDecor::UnderlineStatic | ToggleDecor::OverlineStatic | ToggleDecor::StrikeStatic => {
            let default_offset = match spec.decor {
                ToggleDecor::UnderlineStatic => 8.0,
                ToggleDecor::OverlineStatic => -10.0,
                _ => 0.0,
            };
            let y = c.y + spec.offset_y.unwrap_or(default_offset) * unit;
            let height = spec.height.unwrap_or(4.0) * unit;
            let half = rect.width() / 2.0;
            let mut path = BezPath::new();
            path.move_to((c.x - half, y));
            path.line_to((c.x + half, y));
            // The bar grows horizontally from the word center.
            let tf = cx.transform
                * Affine::translate(c.to_vec2())
                * Affine::scale_non_uniform(t.max(0.0), 1.0)
                * Affine::translate(-c.to_vec2());
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.stroke_path(&path, color, height, Join::Round, Cap::Round);
                Ok(())
            })
        }
        ToggleDecor::Brackets => {
            let gap = spec.gap.unwrap_or(10.0) * unit;
            let thickness = spec.thickness.unwrap_or(3.0) * unit;
            let arm = font * 0.3;
            let (top, bottom) = (c.y - font / 2.0, c.y + font / 2.0);
            let (left, right) = (rect.x0 - gap, rect.x1 + gap);
            let mut path = BezPath::new();
            path.move_to((left + arm, top));
            path.line_to((left, top));
            path.line_to((left, bottom));
            path.line_to((left + arm, bottom));
            path.move_to((right - arm, top));
            path.line_to((right, top));
            path.line_to((right, bottom));
            path.line_to((right - arm, bottom));
            let tf = cx.scaled_about_center(0.8 + 0.2 * t);
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.stroke_path(&path, color, thickness, Join::Miter, Cap::Butt);
                Ok(())
            })
        }
        ToggleDecor::Quotes => {
            let Some(quote) = cx.quote.clone() else {
                return Ok(());
            };
            let gap = spec.gap.unwrap_or(8.0) * unit;
            let baseline = c.y + font * 0.2 + quote.middle_to_baseline();
            let left = Point::new(rect.x0 - gap - quote.width, baseline);
            let right = Point::new(rect.x1 + gap, baseline);
            let tf = cx.scaled_about_center(0.8 + 0.2 * t);
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.fill_glyphs(&quote, left, color);
                p.fill_glyphs(&quote, right, color);
                Ok(())
            })
        }
        ToggleDecor::CaretDown => {
            let size = spec.size.unwrap_or(10.0) * unit;
            let base_y = rect.y0 - spec.offset_y.unwrap_or(16.0) * unit;
            let mut path = BezPath::new();
            path.move_to((c.x - size * 0.6, base_y));
            path.line_to((c.x + size * 0.6, base_y));
            path.line_to((c.x, base_y + size));
            path.close_path();
            let tf = cx.scaled_about_center(0.8 + 0.2 * t);
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.fill_path(&path, color);
                Ok(())
            })
        }
        ToggleDecor::ArrowLeft => {
            let size = spec.size.unwrap_or(12.0) * unit;
            let tip_x = rect.x0 - spec.gap.unwrap_or(8.0) * unit;
            let mut path = BezPath::new();
            path.move_to((tip_x, c.y));
            path.line_to((tip_x - size, c.y - size * 0.6));
            path.line_to((tip_x - size, c.y + size * 0.6));
            path.close_path();
            let tf = cx.scaled_about_center(0.8 + 0.2 * t);
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.fill_path(&path, color);
                Ok(())
            })
        }
        ToggleDecor::PillBehind | ToggleDecor::BoxBehind | ToggleDecor::DimOthers => Ok(()),
    }
}

fn stripes(p: &mut Painter<'_>, rect: Rect, spacing: f64, color: Rgba) {
    let h = rect.height();
    let mut x = rect.x0 - h;
    while x < rect.x1 {
        let mut path = BezPath::new();
        path.move_to((x, rect.y1));
        path.line_to((x + spacing / 2.0, rect.y1));
        path.line_to((x + spacing / 2.0 + h, rect.y0));
        path.line_to((x + h, rect.y0));
        path.close_path();
        p.fill_path(&path, color);
        x += spacing;
    }
}

/// Whether a progress decor draws under the word's glyphs.
pub fn progress_is_behind(decor: ProgressDecor) -> bool {
    matches!(decor, ProgressDecor::Marker | ProgressDecor::BoxFill)
}

/// Draw a progress decor grown to the word's progress.
pub fn draw_progress_decor(
    surface: &mut Surface,
    spec: &ProgressDecorSpec,
    cx: &DecorContext<'_>,
) -> CaptionResult<()> {
    let pv = clamp01(cx.progress);
    let opacity = cx.opacity * spec.opacity.unwrap_or(1.0);
    if pv <= 0.0 || opacity <= 0.0 {
        return Ok(());
    }
    let unit = cx.metrics.unit;
    let font = cx.metrics.font_px;
    let rect = cx.rect();
    let c = cx.word.center;
    let color = cx.color;
    let tf = cx.transform;
    let style = LayerStyle::with_opacity(opacity as f32);

    match spec.decor {
        ProgressDecor::Underline | ProgressDecor::Overline | ProgressDecor::Strike => {
            let default_offset = match spec.decor {
                ProgressDecor::Underline => 8.0,
                ProgressDecor::Overline => -10.0,
                _ => 0.0,
            };
            let height = spec.height.unwrap_or(4.0) * unit;
            let y = c.y + spec.offset_y.unwrap_or(default_offset) * unit;
            let bar = Rect::new(
                rect.x0,
                y - height / 2.0,
                rect.x0 + rect.width() * pv,
                y + height / 2.0,
            );
            let radius = spec.radius.unwrap_or(999.0) * unit;
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.fill_rounded_rect(bar, radius, color);
                Ok(())
            })
        }
        ProgressDecor::Marker => {
            let height = spec.height_em.unwrap_or(0.6) * font;
            let mid = c.y + font * 0.1;
            let pad = spec.padding_x.unwrap_or(4.0) * unit;
            let full = Rect::new(rect.x0 - pad, mid - height / 2.0, rect.x1 + pad, mid + height / 2.0);
            let mark = Rect::new(full.x0, full.y0, full.x0 + full.width() * pv, full.y1);
            let radius = spec.radius.unwrap_or(12.0) * unit;
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.fill_rounded_rect(mark, radius, color);
                Ok(())
            })
        }
        ProgressDecor::BoxFill => {
            let full = rect.inflate(
                spec.padding_x.unwrap_or(12.0) * unit,
                spec.padding_y.unwrap_or(6.0) * unit,
            );
            let radius = spec.radius.unwrap_or(10.0) * unit;
            let clip = Rect::new(full.x0, full.y0, full.x0 + full.width() * pv, full.y1);
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.push_clip(clip);
                p.fill_rounded_rect(full, radius, color);
                p.pop_layer();
                Ok(())
            })
        }
        ProgressDecor::ShimmerText => {
            let band = (spec.band_width.unwrap_or(0.3) * rect.width()).max(1.0);
            let x = rect.x0 - band + (rect.width() + band) * pv;
            let clip = Rect::new(x, rect.y0 - font, x + band, rect.y1 + font);
            let origin = cx.glyph_origin();
            let shaped = Arc::clone(&cx.word.shaped);
            surface.layer(style, |p| {
                p.set_transform(tf);
                p.push_clip(clip);
                p.fill_glyphs(&shaped, origin, color);
                p.pop_layer();
                Ok(())
            })
        }
    }
}

/// Part of `rect` covered by a fill at `progress`.
pub fn fill_rect(direction: FillDirection, rect: Rect, progress: f64) -> Rect {
    let p = clamp01(progress);
    let (w, h) = (rect.width(), rect.height());
    match direction {
        FillDirection::Ltr => Rect::new(rect.x0, rect.y0, rect.x0 + w * p, rect.y1),
        FillDirection::Rtl => Rect::new(rect.x1 - w * p, rect.y0, rect.x1, rect.y1),
        FillDirection::Center => {
            let cx = rect.center().x;
            Rect::new(cx - w * p / 2.0, rect.y0, cx + w * p / 2.0, rect.y1)
        }
        FillDirection::Btt => Rect::new(rect.x0, rect.y1 - h * p, rect.x1, rect.y1),
    }
}

/// Overlay the highlight-colored glyphs of a word, clipped to the filled part.
pub fn draw_progress_fill(
    surface: &mut Surface,
    direction: FillDirection,
    cx: &DecorContext<'_>,
) -> CaptionResult<()> {
    if cx.progress <= 0.0 || cx.opacity <= 0.0 {
        return Ok(());
    }
    // The clip box is taller than the em box so descenders and accents fill too.
    let rect = cx.rect().inflate(cx.metrics.font_px * 0.1, cx.metrics.font_px * 0.25);
    let clip = fill_rect(direction, rect, cx.progress);
    let origin = cx.glyph_origin();
    let shaped = Arc::clone(&cx.word.shaped);
    let (tf, color) = (cx.transform, cx.color);
    surface.layer(LayerStyle::with_opacity(cx.opacity as f32), |p| {
        p.set_transform(tf);
        p.push_clip(clip);
        p.fill_glyphs(&shaped, origin, color);
        p.pop_layer();
        Ok(())
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/decor.rs"]
mod tests;
