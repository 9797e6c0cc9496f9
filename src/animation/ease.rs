use crate::preset::model::TransitionSpec;

/// Damped harmonic oscillator parameters.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpringParams {
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            stiffness: 100.0,
            damping: 10.0,
            mass: 1.0,
        }
    }
}

impl SpringParams {
    pub const fn new(stiffness: f64, damping: f64, mass: f64) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// Replace non-finite or non-positive fields with the defaults.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let pick = |v: f64, fallback: f64| if v.is_finite() && v > 0.0 { v } else { fallback };
        Self {
            stiffness: pick(self.stiffness, d.stiffness),
            damping: pick(self.damping, d.damping),
            mass: pick(self.mass, d.mass),
        }
    }

    /// Undamped angular frequency `sqrt(k/m)`.
    pub fn omega0(self) -> f64 {
        (self.stiffness / self.mass).sqrt()
    }

    /// Damping ratio `c / (2 sqrt(k m))`; below 1 the spring overshoots.
    pub fn damping_ratio(self) -> f64 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }

    pub fn is_underdamped(self) -> bool {
        self.damping_ratio() < 1.0
    }
}

/// Closed-form spring response over normalized time, starting at 0 and settling at 1.
///
/// Time is stretched by 5 so a unit window covers the settle of typical UI springs.
pub fn spring(t: f64, params: SpringParams) -> f64 {
    let p = params.sanitized();
    let t = if t.is_finite() { t.max(0.0) } else { 0.0 };
    let w0 = p.omega0();
    let zeta = p.damping_ratio();
    let s = t * 5.0;

    if zeta < 1.0 {
        let wd = w0 * (1.0 - zeta * zeta).sqrt();
        1.0 - (-zeta * w0 * s).exp() * ((wd * s).cos() + (zeta * w0 / wd) * (wd * s).sin())
    } else {
        1.0 - (-w0 * s).exp() * (1.0 + w0 * s)
    }
}

/// Progress warp for a transition.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    /// Cubic ease-in.
    EaseIn,
    /// Cubic ease-out.
    EaseOut,
    /// Cubic ease-in/out.
    EaseInOut,
    CircOut,
    Spring(SpringParams),
}

impl Ease {
    /// Pick the warp for `transition`: springs by type, otherwise by ease name.
    pub fn from_transition(transition: Option<&TransitionSpec>) -> Self {
        let Some(tr) = transition else {
            return Self::Linear;
        };
        if tr.is_spring() {
            let d = SpringParams::default();
            return Self::Spring(
                SpringParams {
                    stiffness: tr.stiffness.unwrap_or(d.stiffness),
                    damping: tr.damping.unwrap_or(d.damping),
                    mass: tr.mass.unwrap_or(d.mass),
                }
                .sanitized(),
            );
        }
        let name = tr.ease.as_deref().unwrap_or("linear");
        // `easeInOut` contains both `easeIn` and `easeOut`, so it is matched first.
        if name.contains("easeInOut") {
            Self::EaseInOut
        } else if name.contains("easeOut") {
            Self::EaseOut
        } else if name.contains("easeIn") {
            Self::EaseIn
        } else if name.contains("circOut") {
            Self::CircOut
        } else {
            Self::Linear
        }
    }

    /// Apply to progress `t`, clamped to `[0, 1]` first. Only springs may leave `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = crate::foundation::math::clamp01(t);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t * t,
            Self::EaseOut => 1.0 - (1.0 - t).powi(3),
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::CircOut => (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
            Self::Spring(p) => spring(t, p),
        }
    }

    pub fn is_spring(self) -> bool {
        matches!(self, Self::Spring(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
