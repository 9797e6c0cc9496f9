//! Caption geometry: responsive metrics, greedy wrapping, and block and word placement.
//!
//! Every position here is in canvas pixels. Lines are centered on the anchor column and
//! their vertical coordinate is the middle of the em box, the way captions are anchored.

use std::sync::Arc;

use crate::foundation::core::{Canvas, Point, Rect};
use crate::foundation::error::CaptionResult;
use crate::model::style::{Position, Style};
use crate::text::engine::{ShapedLine, TextEngine};

/// Style lengths are authored at this multiple of the reference pixel.
pub const BASE_SCALE: f64 = 2.5;
/// Lines wrap once they exceed this fraction of the canvas width.
pub const WRAP_FRACTION: f64 = 0.85;
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;
const DEFAULT_FONT_SIZE: f64 = 24.0;
const DEFAULT_MARGIN_V: f64 = 100.0;

/// Size factors of one cue on one canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    /// `min(w/1920, h/1080)`.
    pub responsive: f64,
    /// `2.5 * responsive`, applied to style lengths.
    pub unit: f64,
    pub font_px: f64,
    pub line_height: f64,
    pub max_width: f64,
    /// Font size on the reference canvas, used to resolve `em` lengths of presets.
    pub reference_font_px: f64,
}

impl Metrics {
    pub fn new(canvas: Canvas, style: &Style) -> Self {
        let responsive = canvas.responsive_scale();
        let unit = BASE_SCALE * responsive;
        let size = font_size(style);
        let font_px = size * unit;
        Self {
            responsive,
            unit,
            font_px,
            line_height: font_px * LINE_HEIGHT_FACTOR,
            max_width: f64::from(canvas.width) * WRAP_FRACTION,
            reference_font_px: size * BASE_SCALE,
        }
    }
}

fn font_size(style: &Style) -> f64 {
    if style.font_size.is_finite() && style.font_size > 0.0 {
        style.font_size
    } else {
        DEFAULT_FONT_SIZE
    }
}

/// Font size of `style` on the reference canvas.
pub fn reference_font_px(style: &Style) -> f64 {
    font_size(style) * BASE_SCALE
}

/// Face, size and tracking used to shape one piece of text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeParams {
    pub face: usize,
    pub size_px: f32,
    pub spacing: f32,
}

impl ShapeParams {
    pub fn with_spacing(self, spacing: f64) -> Self {
        Self {
            spacing: spacing as f32,
            ..self
        }
    }
}

/// Greedy word wrap of `text` at `max_width`.
///
/// The text stays on one line when it fits. Otherwise words are packed while the running
/// line measures strictly below the limit; a single overlong word keeps its own line.
pub fn wrap_text(
    engine: &mut TextEngine,
    text: &str,
    params: ShapeParams,
    max_width: f64,
) -> CaptionResult<Vec<String>> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let Some((first, rest)) = words.split_first() else {
        return Ok(Vec::new());
    };
    let full = words.join(" ");
    if engine.measure(&full, params.face, params.size_px, params.spacing)? <= max_width {
        return Ok(vec![full]);
    }

    let mut lines = Vec::new();
    let mut current = (*first).to_owned();
    for word in rest {
        let candidate = format!("{current} {word}");
        if engine.measure(&candidate, params.face, params.size_px, params.spacing)? < max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, (*word).to_owned()));
        }
    }
    lines.push(current);
    Ok(lines)
}

/// Anchor of a block of `lines` lines: the horizontal center and the middle of the first line.
pub fn anchor(canvas: Canvas, style: &Style, metrics: &Metrics, lines: usize) -> Point {
    let (w, h) = (f64::from(canvas.width), f64::from(canvas.height));
    let margin_v = if style.margin_v.is_finite() {
        style.margin_v
    } else {
        DEFAULT_MARGIN_V
    };
    let margin = margin_v * metrics.unit;
    let extra = lines.saturating_sub(1) as f64 * metrics.line_height;
    let y = match style.position {
        Position::Bottom => h - margin - extra,
        Position::Top => margin,
        Position::Center => h / 2.0 - extra / 2.0,
    };
    Point::new(w / 2.0, y)
}

/// One shaped line placed on the canvas.
#[derive(Clone, Debug)]
pub struct LineBox {
    pub text: String,
    pub shaped: Arc<ShapedLine>,
    pub left: f64,
    pub middle_y: f64,
}

impl LineBox {
    /// Left edge on the baseline, where glyph drawing starts.
    pub fn origin(&self) -> Point {
        Point::new(self.left, self.middle_y + self.shaped.middle_to_baseline())
    }
}

/// A centered block of lines.
#[derive(Clone, Debug)]
pub struct BlockLayout {
    pub anchor: Point,
    pub lines: Vec<LineBox>,
    pub text_width: f64,
    pub line_height: f64,
}

impl BlockLayout {
    pub fn text_height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }

    /// Center of the block, the pivot of whole-line transforms.
    pub fn center(&self) -> Point {
        let rows = self.lines.len().max(1) as f64;
        Point::new(
            self.anchor.x,
            self.anchor.y + (rows - 1.0) * self.line_height / 2.0,
        )
    }

    /// Measured text box.
    pub fn rect(&self) -> Rect {
        let c = self.center();
        Rect::new(
            c.x - self.text_width / 2.0,
            c.y - self.text_height() / 2.0,
            c.x + self.text_width / 2.0,
            c.y + self.text_height() / 2.0,
        )
    }

    /// Text box padded by half a font size horizontally and a fifth vertically.
    pub fn background_rect(&self, font_px: f64) -> Rect {
        self.rect().inflate(font_px * 0.5, font_px * 0.2)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.shaped.is_empty())
    }
}

/// Shape `lines` and center them on `anchor`, one line height apart.
pub fn layout_block(
    engine: &mut TextEngine,
    lines: &[String],
    params: ShapeParams,
    anchor: Point,
    line_height: f64,
) -> CaptionResult<BlockLayout> {
    let mut boxes = Vec::with_capacity(lines.len());
    let mut text_width = 0.0f64;
    for (i, text) in lines.iter().enumerate() {
        let shaped = engine.shape(text, params.face, params.size_px, params.spacing)?;
        text_width = text_width.max(shaped.width);
        boxes.push(LineBox {
            text: text.clone(),
            left: anchor.x - shaped.width / 2.0,
            middle_y: anchor.y + i as f64 * line_height,
            shaped,
        });
    }
    Ok(BlockLayout {
        anchor,
        lines: boxes,
        text_width,
        line_height,
    })
}

/// One word placed in a word-scope layout.
#[derive(Clone, Debug)]
pub struct WordBox {
    pub index: usize,
    pub row: usize,
    pub text: String,
    pub shaped: Arc<ShapedLine>,
    /// Horizontal center and em-box middle.
    pub center: Point,
}

impl WordBox {
    pub fn width(&self) -> f64 {
        self.shaped.width
    }

    /// Word box one font size tall, centered on the word.
    pub fn rect(&self, font_px: f64) -> Rect {
        Rect::from_center_size(self.center, (self.width(), font_px))
    }
}

/// Words laid out left to right in centered rows.
#[derive(Clone, Debug)]
pub struct WordLayout {
    pub words: Vec<WordBox>,
    pub rows: usize,
    pub anchor: Point,
    pub gap: f64,
}

impl WordLayout {
    /// Bounding box of every word at rest.
    pub fn rect(&self, font_px: f64) -> Rect {
        self.words
            .iter()
            .map(|w| w.rect(font_px))
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::from_origin_size(self.anchor, (0.0, 0.0)))
    }
}

/// Lay out `tokens` with `gap` between words, wrapping rows at `metrics.max_width`.
pub fn layout_words(
    engine: &mut TextEngine,
    tokens: &[&str],
    params: ShapeParams,
    gap: f64,
    canvas: Canvas,
    style: &Style,
    metrics: &Metrics,
) -> CaptionResult<WordLayout> {
    let shaped = tokens
        .iter()
        .map(|t| engine.shape(t, params.face, params.size_px, params.spacing))
        .collect::<CaptionResult<Vec<_>>>()?;

    // Row membership by greedy packing.
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut row_width = 0.0;
    for (i, s) in shaped.iter().enumerate() {
        match rows.last_mut() {
            Some(row) if row_width + gap + s.width <= metrics.max_width => {
                row.push(i);
                row_width += gap + s.width;
            }
            _ => {
                rows.push(vec![i]);
                row_width = s.width;
            }
        }
    }

    let anchor = anchor(canvas, style, metrics, rows.len().max(1));
    let mut words = Vec::with_capacity(tokens.len());
    for (r, row) in rows.iter().enumerate() {
        let total: f64 =
            row.iter().map(|&i| shaped[i].width).sum::<f64>() + gap * row.len().saturating_sub(1) as f64;
        let y = anchor.y + r as f64 * metrics.line_height;
        let mut x = anchor.x - total / 2.0;
        for &i in row {
            let w = shaped[i].width;
            words.push(WordBox {
                index: i,
                row: r,
                text: tokens[i].to_owned(),
                shaped: Arc::clone(&shaped[i]),
                center: Point::new(x + w / 2.0, y),
            });
            x += w + gap;
        }
    }

    Ok(WordLayout {
        words,
        rows: rows.len(),
        anchor,
        gap,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/layout.rs"]
mod tests;
