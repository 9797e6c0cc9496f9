//! Caller-owned drawing surface.
//!
//! Drawing happens in layers: each layer is one `vello_cpu` scene rasterized into a scratch
//! pixmap, optionally blurred, then blended onto the accumulated frame in integer math. Only
//! the pixel region a layer touched is blurred and blended.

use kurbo::{PathEl, Shape};

use crate::foundation::core::{Affine, BezPath, Canvas, Point, Rect};
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::model::color::Rgba;
use crate::render::blur::blur_region;
use crate::render::composite::{BlendMode, PixelRect, clear_region, composite_region};
use crate::render::frame::FrameRGBA;
use crate::text::engine::ShapedLine;

/// How a finished layer lands on the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerStyle {
    pub opacity: f32,
    pub blend: BlendMode,
    /// Gaussian sigma in output pixels; 0 disables the blur.
    pub blur_sigma: f32,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blend: BlendMode::Over,
            blur_sigma: 0.0,
        }
    }
}

impl LayerStyle {
    pub fn with_opacity(opacity: f32) -> Self {
        Self {
            opacity,
            ..Self::default()
        }
    }

    pub fn blurred(mut self, sigma: f32) -> Self {
        self.blur_sigma = sigma;
        self
    }

    pub fn screen(mut self) -> Self {
        self.blend = BlendMode::Screen;
        self
    }
}

/// Line join for strokes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Join {
    Miter,
    Round,
}

/// Line cap for strokes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cap {
    Butt,
    Round,
}

pub struct Surface {
    canvas: Canvas,
    frame: Vec<u8>,
    ctx: vello_cpu::RenderContext,
    scratch: vello_cpu::Pixmap,
    /// Part of `scratch` that may hold pixels of an earlier layer.
    dirty: PixelRect,
    layers_drawn: u64,
}

impl Surface {
    pub fn new(canvas: Canvas) -> CaptionResult<Self> {
        let w: u16 = canvas
            .width
            .try_into()
            .map_err(|_| CaptionError::render("surface width exceeds u16"))?;
        let h: u16 = canvas
            .height
            .try_into()
            .map_err(|_| CaptionError::render("surface height exceeds u16"))?;
        Ok(Self {
            canvas,
            frame: vec![0u8; canvas.frame_bytes()],
            ctx: vello_cpu::RenderContext::new(w, h),
            scratch: vello_cpu::Pixmap::new(w, h),
            dirty: PixelRect::default(),
            layers_drawn: 0,
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.frame.fill(0);
    }

    /// Premultiplied RGBA8 frame bytes.
    pub fn data(&self) -> &[u8] {
        &self.frame
    }

    /// Layers blended since construction.
    pub fn layers_drawn(&self) -> u64 {
        self.layers_drawn
    }

    /// Copy of the current pixels as an immutable frame.
    pub fn snapshot(&self) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.frame.as_slice().into(),
            premultiplied: true,
        }
    }

    /// Draw one layer with `draw`, then blend it onto the frame with `style`.
    pub fn layer<F>(&mut self, style: LayerStyle, draw: F) -> CaptionResult<()>
    where
        F: FnOnce(&mut Painter<'_>) -> CaptionResult<()>,
    {
        if style.opacity.is_nan() || style.opacity <= 0.0 {
            return Ok(());
        }
        let (w, h) = (self.canvas.width, self.canvas.height);
        self.ctx.reset();
        let bounds = {
            let mut painter = Painter::new(&mut self.ctx);
            draw(&mut painter)?;
            painter.finish()
        };
        let Some(bounds) = bounds else {
            return Ok(());
        };
        let region = PixelRect::covering(bounds, w, h);
        if region.is_empty() {
            return Ok(());
        }

        // Antialiasing may touch the pixel just outside the tracked bounds.
        let region = region.inflate(1, w, h);
        self.ctx.flush();
        clear_region(self.scratch.data_as_u8_slice_mut(), w, self.dirty.union(region));
        self.dirty = PixelRect::full(w, h);
        self.ctx.render_to_pixmap(&mut self.scratch);

        let region = if style.blur_sigma > 0.0 {
            blur_region(
                self.scratch.data_as_u8_slice_mut(),
                w,
                h,
                region,
                style.blur_sigma,
            )?
        } else {
            region
        };
        self.dirty = region;
        composite_region(
            &mut self.frame,
            self.scratch.data_as_u8_slice(),
            w,
            region,
            style.blend,
            style.opacity,
        )?;
        self.layers_drawn += 1;
        Ok(())
    }
}

/// Drawing handle for one layer. Tracks the device-space bounds of everything drawn.
pub struct Painter<'a> {
    ctx: &'a mut vello_cpu::RenderContext,
    transform: Affine,
    bounds: Option<Rect>,
    open_layers: usize,
}

impl<'a> Painter<'a> {
    fn new(ctx: &'a mut vello_cpu::RenderContext) -> Self {
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Self {
            ctx,
            transform: Affine::IDENTITY,
            bounds: None,
            open_layers: 0,
        }
    }

    fn finish(mut self) -> Option<Rect> {
        while self.open_layers > 0 {
            self.pop_layer();
        }
        self.bounds
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
        self.ctx.set_transform(affine_to_cpu(transform));
    }

    fn touch(&mut self, local: Rect, pad: f64) {
        let device = self.transform.transform_rect_bbox(local.inflate(pad, pad));
        self.bounds = Some(match self.bounds {
            Some(b) => b.union(device),
            None => device,
        });
    }

    pub fn fill_path(&mut self, path: &BezPath, color: Rgba) {
        if color.is_transparent() {
            return;
        }
        self.ctx.set_paint(color.to_paint());
        self.ctx.fill_path(&bezpath_to_cpu(path));
        self.touch(path.bounding_box(), 1.0);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        if color.is_transparent() || rect.width() <= 0.0 || rect.height() <= 0.0 {
            return;
        }
        self.ctx.set_paint(color.to_paint());
        self.ctx.fill_rect(&rect_to_cpu(rect));
        self.touch(rect, 1.0);
    }

    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: Rgba) {
        let radius = radius.max(0.0).min(rect.width().min(rect.height()).abs() / 2.0);
        if radius <= 0.0 {
            self.fill_rect(rect, color);
            return;
        }
        let path = kurbo::RoundedRect::from_rect(rect, radius).to_path(0.1);
        self.fill_path(&path, color);
    }

    pub fn stroke_path(&mut self, path: &BezPath, color: Rgba, width: f64, join: Join, cap: Cap) {
        if color.is_transparent() || width <= 0.0 {
            return;
        }
        self.ctx.set_paint(color.to_paint());
        self.ctx.set_stroke(stroke_to_cpu(width, join, cap));
        self.ctx.stroke_path(&bezpath_to_cpu(path));
        self.touch(path.bounding_box(), width / 2.0 + 1.0);
    }

    /// Fill `line` with its left edge at `origin.x` and baseline at `origin.y`.
    pub fn fill_glyphs(&mut self, line: &ShapedLine, origin: Point, color: Rgba) {
        if color.is_transparent() || line.is_empty() {
            return;
        }
        self.ctx.set_paint(color.to_paint());
        self.ctx
            .glyph_run(&line.font)
            .font_size(line.font_size)
            .fill_glyphs(cpu_glyphs(line, origin));
        self.touch(glyph_bounds(line, origin), 1.0);
    }

    /// Stroke glyph outlines of `line`; the stroke straddles the outline.
    pub fn stroke_glyphs(&mut self, line: &ShapedLine, origin: Point, color: Rgba, width: f64, join: Join) {
        if color.is_transparent() || line.is_empty() || width <= 0.0 {
            return;
        }
        self.ctx.set_paint(color.to_paint());
        self.ctx.set_stroke(stroke_to_cpu(width, join, Cap::Round));
        self.ctx
            .glyph_run(&line.font)
            .font_size(line.font_size)
            .stroke_glyphs(cpu_glyphs(line, origin));
        self.touch(glyph_bounds(line, origin), width / 2.0 + 1.0);
    }

    /// Restrict later drawing to `rect` (in the current transform) until [`Self::pop_layer`].
    pub fn push_clip(&mut self, rect: Rect) {
        let mut path = BezPath::new();
        path.move_to((rect.x0, rect.y0));
        path.line_to((rect.x1, rect.y0));
        path.line_to((rect.x1, rect.y1));
        path.line_to((rect.x0, rect.y1));
        path.close_path();
        self.ctx.push_clip_layer(&bezpath_to_cpu(&path));
        self.open_layers += 1;
    }

    /// Multiply later drawing by `opacity` until [`Self::pop_layer`].
    pub fn push_opacity(&mut self, opacity: f32) {
        self.ctx.push_opacity_layer(opacity.clamp(0.0, 1.0));
        self.open_layers += 1;
    }

    pub fn pop_layer(&mut self) {
        if self.open_layers > 0 {
            self.ctx.pop_layer();
            self.open_layers -= 1;
        }
    }
}

/// Generous box around a glyph run so overhanging outlines are never clipped from the blend.
fn glyph_bounds(line: &ShapedLine, origin: Point) -> Rect {
    let size = f64::from(line.font_size);
    Rect::new(
        origin.x - size * 0.5,
        origin.y - line.ascent.max(size) - size * 0.25,
        origin.x + line.width + size * 0.5,
        origin.y + line.descent.max(size * 0.3) + size * 0.25,
    )
}

fn cpu_glyphs(line: &ShapedLine, origin: Point) -> impl Iterator<Item = vello_cpu::Glyph> + '_ {
    let (ox, oy) = (origin.x as f32, origin.y as f32);
    line.glyphs.iter().map(move |g| vello_cpu::Glyph {
        id: g.id,
        x: ox + g.x,
        y: oy + g.y,
    })
}

fn stroke_to_cpu(width: f64, join: Join, cap: Cap) -> vello_cpu::kurbo::Stroke {
    let mut stroke = vello_cpu::kurbo::Stroke::new(width);
    stroke.join = match join {
        Join::Miter => vello_cpu::kurbo::Join::Miter,
        Join::Round => vello_cpu::kurbo::Join::Round,
    };
    let cap = match cap {
        Cap::Butt => vello_cpu::kurbo::Cap::Butt,
        Cap::Round => vello_cpu::kurbo::Cap::Round,
    };
    stroke.start_cap = cap;
    stroke.end_cap = cap;
    stroke
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
