//! Per-unit text shaping.
//!
//! Every render unit owns one [`TextEngine`]: it registers the font book with its own Parley
//! contexts on construction, so no font state is shared between threads.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::foundation::error::{CaptionError, CaptionResult};
use crate::text::fonts::FontBook;

/// Shaped lines kept before the cache is dropped wholesale.
const SHAPE_CACHE_LIMIT: usize = 4096;

/// Glyph placed relative to the line's left edge on the baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// One run of text shaped with a single face.
#[derive(Clone, Debug)]
pub struct ShapedLine {
    pub width: f64,
    /// Distance from the baseline to the top of the line box.
    pub ascent: f64,
    /// Distance from the baseline to the bottom of the line box (positive).
    pub descent: f64,
    pub font_size: f32,
    pub glyphs: Vec<PlacedGlyph>,
    pub font: vello_cpu::peniko::FontData,
}

impl ShapedLine {
    /// Offset from the vertical middle of the em box down to the baseline.
    pub fn middle_to_baseline(&self) -> f64 {
        (self.ascent - self.descent) / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ShapeKey {
    text: String,
    face: usize,
    size_bits: u32,
    spacing_bits: u32,
}

struct RegisteredFace {
    family: String,
    weight: f32,
    italic: bool,
    font: vello_cpu::peniko::FontData,
}

pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    faces: Vec<RegisteredFace>,
    cache: HashMap<ShapeKey, Arc<ShapedLine>>,
    hits: u64,
    misses: u64,
}

impl TextEngine {
    /// Register every face of `book` with fresh Parley contexts.
    pub fn new(book: &FontBook) -> CaptionResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let mut faces = Vec::with_capacity(book.len());
        for face in book.faces() {
            let families = font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(face.data.as_ref().clone()), None);
            let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
                CaptionError::validation(format!("font '{}' registered no families", face.label))
            })?;
            let family = font_ctx
                .collection
                .family_name(family_id)
                .ok_or_else(|| {
                    CaptionError::validation(format!("font '{}' has no family name", face.label))
                })?
                .to_string();
            faces.push(RegisteredFace {
                family,
                weight: face.weight,
                italic: face.italic,
                font: vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(face.data.as_ref().clone()),
                    0,
                ),
            });
        }
        if faces.is_empty() {
            return Err(CaptionError::validation("text engine needs at least one font"));
        }
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            faces,
            cache: HashMap::new(),
            hits: 0,
            misses: 0,
        })
    }

    /// Family names in registration order.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.faces.iter().map(|f| f.family.as_str())
    }

    /// Pick the face for `family` closest to `weight`, preferring upright faces.
    ///
    /// Unknown families fall back to every registered face. Ties go to the earlier face.
    pub fn select_face(&self, family: &str, weight: f32) -> usize {
        let wanted = family.trim().trim_matches(['"', '\'']);
        let named: Vec<usize> = (0..self.faces.len())
            .filter(|&i| self.faces[i].family.eq_ignore_ascii_case(wanted))
            .collect();
        let pool: Vec<usize> = if named.is_empty() {
            (0..self.faces.len()).collect()
        } else {
            named
        };
        pool.into_iter()
            .min_by(|&a, &b| {
                let score = |i: usize| {
                    let f = &self.faces[i];
                    ((f.weight - weight).abs(), f.italic)
                };
                let (wa, ia) = score(a);
                let (wb, ib) = score(b);
                wa.total_cmp(&wb).then(ia.cmp(&ib)).then(a.cmp(&b))
            })
            .unwrap_or(0)
    }

    /// Shape `text` on one line with face `face` at `size_px`, adding `spacing` after every
    /// glyph.
    pub fn shape(
        &mut self,
        text: &str,
        face: usize,
        size_px: f32,
        spacing: f32,
    ) -> CaptionResult<Arc<ShapedLine>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CaptionError::validation("text size must be finite and > 0"));
        }
        let spacing = if spacing.is_finite() { spacing } else { 0.0 };
        let reg = self
            .faces
            .get(face)
            .ok_or_else(|| CaptionError::render(format!("unknown face index {face}")))?;

        let key = ShapeKey {
            text: text.to_owned(),
            face,
            size_bits: size_px.to_bits(),
            spacing_bits: spacing.to_bits(),
        };
        if let Some(hit) = self.cache.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(hit));
        }
        self.misses += 1;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontFamily(
            parley::style::FontFamily::Source(Cow::Owned(reg.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(reg.weight),
        ));
        if reg.italic {
            builder.push_default(parley::style::StyleProperty::FontStyle(
                parley::style::FontStyle::Italic,
            ));
        }
        builder.push_default(parley::style::StyleProperty::LetterSpacing(spacing));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let mut glyphs = Vec::with_capacity(text.len());
        let (mut ascent, mut descent, mut baseline) =
            (f64::from(size_px) * 0.8, f64::from(size_px) * 0.2, 0.0f32);
        if let Some(line) = layout.lines().next() {
            let m = line.metrics();
            ascent = f64::from(m.ascent);
            descent = f64::from(m.descent.abs());
            baseline = m.baseline;
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                glyphs.extend(run.positioned_glyphs().map(|g| PlacedGlyph {
                    id: g.id,
                    x: g.x,
                    y: g.y - baseline,
                }));
            }
        }

        let shaped = Arc::new(ShapedLine {
            width: f64::from(layout.width()),
            ascent,
            descent,
            font_size: size_px,
            glyphs,
            font: reg.font.clone(),
        });

        if self.cache.len() >= SHAPE_CACHE_LIMIT {
            tracing::debug!(entries = self.cache.len(), "shape cache full, clearing");
            self.cache.clear();
        }
        self.cache.insert(key, Arc::clone(&shaped));
        Ok(shaped)
    }

    /// Advance width of `text` as [`Self::shape`] would lay it out.
    pub fn measure(&mut self, text: &str, face: usize, size_px: f32, spacing: f32) -> CaptionResult<f64> {
        Ok(self.shape(text, face, size_px, spacing)?.width)
    }

    /// `(hits, misses)` of the shaping cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/engine.rs"]
mod tests;
