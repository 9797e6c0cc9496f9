use crate::foundation::error::{CaptionError, CaptionResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Reference canvas the caption style values are authored against.
pub const REFERENCE_WIDTH: f64 = 1920.0;
/// Reference canvas height, see [`REFERENCE_WIDTH`].
pub const REFERENCE_HEIGHT: f64 = 1080.0;

/// Absolute 0-based output frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> CaptionResult<Self> {
        if start.0 > end.0 {
            return Err(CaptionError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Range covering `[0, total)`.
    pub fn first(total: u64) -> Self {
        Self {
            start: FrameIndex(0),
            end: FrameIndex(total),
        }
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Split into at most `parts` contiguous, non-overlapping, non-empty ranges.
    ///
    /// Earlier parts receive the remainder frames, so part lengths differ by at most one.
    pub fn split_even(self, parts: usize) -> Vec<FrameRange> {
        let len = self.len_frames();
        if len == 0 {
            return Vec::new();
        }
        let parts = (parts.max(1) as u64).min(len);
        let base = len / parts;
        let extra = len % parts;

        let mut out = Vec::with_capacity(parts as usize);
        let mut cursor = self.start.0;
        for i in 0..parts {
            let n = base + u64::from(i < extra);
            out.push(FrameRange {
                start: FrameIndex(cursor),
                end: FrameIndex(cursor + n),
            });
            cursor += n;
        }
        out
    }

    /// Iterate the frame indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> CaptionResult<Self> {
        if den == 0 {
            return Err(CaptionError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(CaptionError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Parse `"30"`, `"30000/1001"` or `"29.97"`.
    ///
    /// Decimal rates map to the NTSC rationals when they are within 0.01 of one.
    pub fn parse(s: &str) -> CaptionResult<Self> {
        let s = s.trim();
        if let Some((n, d)) = s.split_once('/') {
            let num = n
                .trim()
                .parse::<u32>()
                .map_err(|e| CaptionError::validation(format!("invalid fps numerator '{n}': {e}")))?;
            let den = d.trim().parse::<u32>().map_err(|e| {
                CaptionError::validation(format!("invalid fps denominator '{d}': {e}"))
            })?;
            return Self::new(num, den);
        }
        let v = s
            .parse::<f64>()
            .map_err(|e| CaptionError::validation(format!("invalid fps '{s}': {e}")))?;
        Self::from_f64(v)
    }

    /// Convert a floating-point rate into a rational.
    pub fn from_f64(fps: f64) -> CaptionResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(CaptionError::validation("fps must be finite and > 0"));
        }
        for (num, den) in [(24000u32, 1001u32), (30000, 1001), (60000, 1001)] {
            if (fps - f64::from(num) / f64::from(den)).abs() < 0.01 {
                return Self::new(num, den);
            }
        }
        if (fps - fps.round()).abs() < 1e-9 {
            return Self::new(fps.round() as u32, 1);
        }
        Self::new((fps * 1000.0).round() as u32, 1000)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Presentation time of frame `idx` in seconds.
    pub fn frame_time(self, idx: FrameIndex) -> f64 {
        (idx.0 as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Number of frames needed to cover `secs`, rounding up.
    pub fn frames_for_duration(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        // Guard against 3.0 * 30.0 landing on 90.00000000000001.
        (secs * self.as_f64() - 1e-9).ceil().max(0.0) as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas. The raster backend addresses pixels with `u16`.
    pub fn new(width: u32, height: u32) -> CaptionResult<Self> {
        if width == 0 || height == 0 {
            return Err(CaptionError::validation("canvas width/height must be > 0"));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(CaptionError::validation(format!(
                "canvas {width}x{height} exceeds the {}px raster limit",
                u16::MAX
            )));
        }
        Ok(Self { width, height })
    }

    /// Scale relative to the 1920x1080 reference, fitting both axes.
    pub fn responsive_scale(self) -> f64 {
        (f64::from(self.width) / REFERENCE_WIDTH).min(f64::from(self.height) / REFERENCE_HEIGHT)
    }

    /// Full canvas rectangle.
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Size of one RGBA8 frame in bytes.
    pub fn frame_bytes(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
