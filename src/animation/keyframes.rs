//! Evenly spaced keyframe sampling.

use crate::foundation::math::{clamp01, lerp};

/// Locate the segment containing `t` in an `n`-stop track.
///
/// Returns the lower stop index and the local progress inside that segment. `t` is clamped
/// to `[0, 1]`; a single stop is constant.
pub fn bracket(n: usize, t: f64) -> Option<(usize, f64)> {
    match n {
        0 => None,
        1 => Some((0, 0.0)),
        _ => {
            let t = clamp01(t);
            let segment = 1.0 / (n - 1) as f64;
            let idx = ((t / segment).floor() as usize).min(n - 2);
            let local = clamp01((t - idx as f64 * segment) / segment);
            Some((idx, local))
        }
    }
}

/// Sample a track of stops with a caller-supplied blend.
pub fn sample_with<T: Clone>(stops: &[T], t: f64, blend: impl Fn(&T, &T, f64) -> T) -> Option<T> {
    let (idx, local) = bracket(stops.len(), t)?;
    if stops.len() == 1 {
        return Some(stops[0].clone());
    }
    Some(blend(&stops[idx], &stops[idx + 1], local))
}

/// Linear interpolation over evenly spaced numeric stops.
pub fn interpolate(values: &[f64], t: f64) -> Option<f64> {
    sample_with(values, t, |a, b, k| lerp(*a, *b, k))
}

#[cfg(test)]
#[path = "../../tests/unit/animation/keyframes.rs"]
mod tests;
