//! Fixed-point compositing of premultiplied RGBA8 buffers.

use crate::foundation::core::Rect;
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u8, unit_to_u8};

pub type PremulRgba8 = [u8; 4];

/// How a layer combines with what is already on the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Over,
    /// `s + d - s*d`; glows brighten without darkening what is below.
    Screen,
}

/// Integer pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
        }
    }

    /// Pixels touched by `r`, clipped to a `width x height` canvas.
    pub fn covering(r: Rect, width: u32, height: u32) -> Self {
        if !(r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()) {
            return Self::full(width, height);
        }
        let clamp_x = |v: f64| v.clamp(0.0, f64::from(width)) as u32;
        let clamp_y = |v: f64| v.clamp(0.0, f64::from(height)) as u32;
        let out = Self {
            x0: clamp_x(r.x0.floor()),
            y0: clamp_y(r.y0.floor()),
            x1: clamp_x(r.x1.ceil()),
            y1: clamp_y(r.y1.ceil()),
        };
        if out.is_empty() { Self::default() } else { out }
    }

    pub fn is_empty(self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    pub fn union(self, other: PixelRect) -> PixelRect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        PixelRect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grow by `by` pixels on every side, clipped to the canvas.
    pub fn inflate(self, by: u32, width: u32, height: u32) -> PixelRect {
        if self.is_empty() {
            return self;
        }
        PixelRect {
            x0: self.x0.saturating_sub(by),
            y0: self.y0.saturating_sub(by),
            x1: self.x1.saturating_add(by).min(width),
            y1: self.y1.saturating_add(by).min(height),
        }
    }

    pub fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

/// `src` over `dst` with extra opacity `op` on the 0..=255 scale.
pub fn over(dst: PremulRgba8, src: PremulRgba8, op: u16) -> PremulRgba8 {
    if op == 0 || src[3] == 0 {
        return dst;
    }
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Screen blend of premultiplied pixels, alpha included.
pub fn screen(dst: PremulRgba8, src: PremulRgba8, op: u16) -> PremulRgba8 {
    if op == 0 || src[3] == 0 {
        return dst;
    }
    let mut out = [0u8; 4];
    for i in 0..4 {
        let s = mul_div255_u8(u16::from(src[i]), op);
        let d = dst[i];
        let sd = mul_div255_u8(u16::from(s), u16::from(d));
        out[i] = add_sat_u8(s, d).saturating_sub(sd);
    }
    out
}

/// Blend `src` onto `dst` inside `region`. Both buffers are `width`-wide RGBA8.
pub fn composite_region(
    dst: &mut [u8],
    src: &[u8],
    width: u32,
    region: PixelRect,
    mode: BlendMode,
    opacity: f32,
) -> CaptionResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(CaptionError::render(
            "composite_region expects equal-length rgba8 buffers",
        ));
    }
    let stride = width as usize * 4;
    if region.is_empty() || region.y1 as usize * stride > dst.len() || region.x1 > width {
        return Ok(());
    }
    let op = unit_to_u8(opacity);
    if op == 0 {
        return Ok(());
    }

    for y in region.y0..region.y1 {
        let row = y as usize * stride;
        let (a, b) = (row + region.x0 as usize * 4, row + region.x1 as usize * 4);
        for (d, s) in dst[a..b].chunks_exact_mut(4).zip(src[a..b].chunks_exact(4)) {
            let dp = [d[0], d[1], d[2], d[3]];
            let sp = [s[0], s[1], s[2], s[3]];
            let out = match mode {
                BlendMode::Over => over(dp, sp, op),
                BlendMode::Screen => screen(dp, sp, op),
            };
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

/// Zero the pixels of `region`.
pub fn clear_region(buf: &mut [u8], width: u32, region: PixelRect) {
    let stride = width as usize * 4;
    if region.is_empty() || region.y1 as usize * stride > buf.len() {
        return;
    }
    for y in region.y0..region.y1 {
        let row = y as usize * stride;
        buf[row + region.x0 as usize * 4..row + region.x1 as usize * 4].fill(0);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
