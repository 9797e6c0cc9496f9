//! Declarative effect presets.
//!
//! Each transition slot is a tagged union keyed by its `type` field, so the resolver and the
//! rasterizer match exhaustively on the variant instead of probing for property presence.

use serde::{Deserialize, Serialize};

use crate::foundation::math::parse_leading_f64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Line,
    Word,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Premium,
    Cinematic,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Cinematic => "cinematic",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectPreset {
    pub id: String,
    pub name: String,
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<LineTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<LineTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<WordActive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inactive: Option<AnimationProps>,
}

impl EffectPreset {
    pub fn is_word_scope(&self) -> bool {
        self.scope == Scope::Word
    }
}

/// Entry or exit of a whole line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LineTransition {
    LineMotion(MotionSpec),
    LineClipReveal(ClipRevealSpec),
}

impl LineTransition {
    /// Length of the transition window in seconds (0.3 when unspecified).
    pub fn window(&self) -> f64 {
        let d = match self {
            Self::LineMotion(m) => m.transition.as_ref().and_then(|t| t.duration),
            Self::LineClipReveal(c) => Some(c.duration),
        };
        match d {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => DEFAULT_TRANSITION_SECS,
        }
    }
}

/// Window used when a transition omits its duration.
pub const DEFAULT_TRANSITION_SECS: f64 = 0.3;

/// Treatment of the currently spoken word.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WordActive {
    WordMotion(MotionSpec),
    WordProgressFill(ProgressFillSpec),
    WordProgressDecor(ProgressDecorSpec),
    WordDecorToggle(DecorToggleSpec),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MotionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<AnimationProps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animate: Option<AnimationProps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<AnimationProps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Tween,
    Spring,
    Inertia,
    Just,
    Keyframes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransitionSpec {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransitionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ease: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damping: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl TransitionSpec {
    pub fn is_spring(&self) -> bool {
        self.kind == Some(TransitionKind::Spring)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipDirection {
    Ltr,
    Rtl,
    Ttb,
    Btt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipRevealSpec {
    pub direction: ClipDirection,
    pub duration: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillDirection {
    Ltr,
    Rtl,
    Center,
    Btt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressFillSpec {
    pub direction: FillDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressDecor {
    Underline,
    Overline,
    Strike,
    Marker,
    BoxFill,
    ShimmerText,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDecorSpec {
    pub decor: ProgressDecor,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub height_em: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
    #[serde(default)]
    pub padding_x: Option<f64>,
    #[serde(default)]
    pub padding_y: Option<f64>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub band_width: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToggleDecor {
    PillBehind,
    BoxBehind,
    Halo,
    Brackets,
    Quotes,
    CaretDown,
    ArrowLeft,
    Tape,
    ShadowPop,
    Outline,
    UnderlineStatic,
    OverlineStatic,
    StrikeStatic,
    BackdropBlurChip,
    DimOthers,
}

impl ToggleDecor {
    /// Decorations that slide between words instead of popping in place.
    pub fn migrates(self) -> bool {
        matches!(self, Self::PillBehind | Self::BoxBehind)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecorToggleSpec {
    pub decor: ToggleDecor,
    #[serde(default)]
    pub padding_x: Option<f64>,
    #[serde(default)]
    pub padding_y: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub gap: Option<f64>,
    #[serde(default)]
    pub thickness: Option<f64>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub stroke_width: Option<f64>,
    #[serde(default)]
    pub blur_px: Option<f64>,
    #[serde(default)]
    pub inactive_opacity: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

/// One animatable property set. Absent properties keep their caller default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate_x: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate_y: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skew_x: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skew_y: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_shadow: Option<PropValue>,
}

/// Property value: a constant or keyframes spaced evenly over `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Scalar(Scalar),
    Keyframes(Vec<Scalar>),
}

impl PropValue {
    pub fn is_keyframes(&self) -> bool {
        matches!(self, Self::Keyframes(_))
    }

    /// All stops in order; a scalar is a single stop.
    pub fn stops(&self) -> &[Scalar] {
        match self {
            Self::Scalar(s) => std::slice::from_ref(s),
            Self::Keyframes(v) => v,
        }
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Scalar(Scalar::Number(v))
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Scalar(Scalar::Text(v.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    /// Unit-suffixed or functional value (`"12deg"`, `"0.2em"`, `"blur(8px)"`).
    Text(String),
}

impl Scalar {
    /// Leading numeric value, ignoring any unit suffix.
    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => parse_leading_f64(s),
        }
    }

    /// Length in pixels; `em` values scale by `font_px`.
    pub fn length(&self, font_px: f64) -> Option<f64> {
        let v = self.number()?;
        match self {
            Self::Text(s) if s.trim_end().ends_with("em") => Some(v * font_px),
            _ => Some(v),
        }
    }

    /// Radius of a `blur(Npx)` filter.
    pub fn blur_px(&self) -> Option<f64> {
        let Self::Text(s) = self else {
            return None;
        };
        let inner = s.trim().strip_prefix("blur(")?;
        let inner = inner.strip_suffix(')')?.trim();
        let inner = inner.strip_suffix("px").unwrap_or(inner);
        inner.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preset/model.rs"]
mod tests;
