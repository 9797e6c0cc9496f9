//! Deterministic blur of premultiplied RGBA8, limited to a pixel region.
//!
//! Small sigmas use an exact Q16 gaussian kernel. Large sigmas switch to three box passes,
//! whose cost does not grow with the radius.

use crate::foundation::error::{CaptionError, CaptionResult};
use crate::render::composite::PixelRect;

/// Above this sigma the three-box approximation replaces the gaussian kernel.
pub const BOX_BLUR_SIGMA: f32 = 8.0;

/// How far a blur of `sigma` spreads coverage, in pixels.
pub fn blur_extent(sigma: f32) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    if sigma > BOX_BLUR_SIGMA {
        box_sizes_for_gaussian(sigma).iter().map(|s| s / 2).sum()
    } else {
        gaussian_radius(sigma)
    }
}

/// Blur `buf` (a `width x height` RGBA8 image) inside `region` grown by the blur extent.
///
/// Edges clamp to the grown region. Returns the region that may now hold coverage.
pub fn blur_region(
    buf: &mut [u8],
    width: u32,
    height: u32,
    region: PixelRect,
    sigma: f32,
) -> CaptionResult<PixelRect> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CaptionError::render("blur buffer size overflow"))?;
    if buf.len() != expected_len {
        return Err(CaptionError::render(
            "blur_region expects a buffer matching width*height*4",
        ));
    }
    let extent = blur_extent(sigma);
    if extent == 0 || region.is_empty() {
        return Ok(region);
    }

    let grown = region.inflate(extent, width, height);
    let (rw, rh) = (grown.width() as usize, grown.height() as usize);
    let stride = width as usize * 4;

    let mut local = vec![0u8; rw * rh * 4];
    for y in 0..rh {
        let src = (grown.y0 as usize + y) * stride + grown.x0 as usize * 4;
        local[y * rw * 4..(y + 1) * rw * 4].copy_from_slice(&buf[src..src + rw * 4]);
    }

    let blurred = if sigma > BOX_BLUR_SIGMA {
        let mut cur = local;
        let mut tmp = vec![0u8; cur.len()];
        for size in box_sizes_for_gaussian(sigma) {
            let r = size / 2;
            box_pass_horizontal(&cur, &mut tmp, rw, rh, r);
            box_pass_vertical(&tmp, &mut cur, rw, rh, r);
        }
        cur
    } else {
        let kernel = gaussian_kernel_q16(gaussian_radius(sigma), sigma)?;
        let mut tmp = vec![0u8; local.len()];
        let mut out = vec![0u8; local.len()];
        horizontal_pass(&local, &mut tmp, rw, rh, &kernel);
        vertical_pass(&tmp, &mut out, rw, rh, &kernel);
        out
    };

    for y in 0..rh {
        let dst = (grown.y0 as usize + y) * stride + grown.x0 as usize * 4;
        buf[dst..dst + rw * 4].copy_from_slice(&blurred[y * rw * 4..(y + 1) * rw * 4]);
    }
    Ok(grown)
}

fn gaussian_radius(sigma: f32) -> u32 {
    (sigma * 3.0).ceil().max(1.0) as u32
}

pub(crate) fn gaussian_kernel_q16(radius: u32, sigma: f32) -> CaptionResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(CaptionError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| (-(f64::from(i) * f64::from(i)) / denom).exp())
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(CaptionError::render("gaussian kernel sum is zero"));
    }

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    // Rounding drift goes to the center tap so the kernel sums to exactly 1.0 in Q16.
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

/// Odd box widths whose three-pass convolution approximates a gaussian of `sigma`.
pub(crate) fn box_sizes_for_gaussian(sigma: f32) -> [u32; 3] {
    let n = 3.0f64;
    let s = f64::from(sigma);
    let w_ideal = (12.0 * s * s / n + 1.0).sqrt();
    let mut wl = w_ideal.floor() as i64;
    if wl % 2 == 0 {
        wl -= 1;
    }
    let wl = wl.max(1);
    let wu = wl + 2;
    let wlf = wl as f64;
    let m = ((12.0 * s * s - n * wlf * wlf - 4.0 * n * wlf - 3.0 * n) / (-4.0 * wlf - 4.0)).round();
    let m = m.clamp(0.0, n) as usize;
    let mut out = [0u32; 3];
    for (i, size) in out.iter_mut().enumerate() {
        *size = if i < m { wl as u32 } else { wu as u32 };
    }
    out
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], w: usize, h: usize, k: &[u32]) {
    let radius = (k.len() / 2) as isize;
    let max_x = w as isize - 1;
    for y in 0..h {
        let row = y * w;
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x as isize + ki as isize - radius).clamp(0, max_x) as usize;
                let idx = (row + sx) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = (row + x) * 4;
            for c in 0..4 {
                dst[out + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], w: usize, h: usize, k: &[u32]) {
    let radius = (k.len() / 2) as isize;
    let max_y = h as isize - 1;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y as isize + ki as isize - radius).clamp(0, max_y) as usize;
                let idx = (sy * w + x) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = (y * w + x) * 4;
            for c in 0..4 {
                dst[out + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

/// Running-sum box filter along rows with clamped edges.
fn box_pass_horizontal(src: &[u8], dst: &mut [u8], w: usize, h: usize, r: u32) {
    let r = r as isize;
    let div = (2 * r + 1) as u32;
    let max_x = w as isize - 1;
    for y in 0..h {
        let row = y * w;
        let at = |x: isize, c: usize| u32::from(src[(row + x.clamp(0, max_x) as usize) * 4 + c]);
        let mut acc = [0u32; 4];
        for c in 0..4 {
            acc[c] = (-r..=r).map(|dx| at(dx, c)).sum();
        }
        for x in 0..w as isize {
            let out = (row + x as usize) * 4;
            for c in 0..4 {
                dst[out + c] = ((acc[c] + div / 2) / div).min(255) as u8;
                acc[c] = acc[c] + at(x + r + 1, c) - at(x - r, c);
            }
        }
    }
}

fn box_pass_vertical(src: &[u8], dst: &mut [u8], w: usize, h: usize, r: u32) {
    let r = r as isize;
    let div = (2 * r + 1) as u32;
    let max_y = h as isize - 1;
    for x in 0..w {
        let at = |y: isize, c: usize| u32::from(src[(y.clamp(0, max_y) as usize * w + x) * 4 + c]);
        let mut acc = [0u32; 4];
        for c in 0..4 {
            acc[c] = (-r..=r).map(|dy| at(dy, c)).sum();
        }
        for y in 0..h as isize {
            let out = (y as usize * w + x) * 4;
            for c in 0..4 {
                dst[out + c] = ((acc[c] + div / 2) / div).min(255) as u8;
                acc[c] = acc[c] + at(y + r + 1, c) - at(y - r, c);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/blur.rs"]
mod tests;
