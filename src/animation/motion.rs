//! Property resolution and per-element motion state.
//!
//! A preset describes properties as constants or keyframe tracks. [`resolve`] samples them at a
//! local progress; [`MotionState`] is the concrete, fully defaulted result the rasterizer
//! consumes. Line transitions and word states are built on top of both.

use crate::animation::ease::Ease;
use crate::animation::keyframes::interpolate;
use crate::animation::shadow::{self, ShadowSpec};
use crate::foundation::core::{Affine, Rect, Vec2};
use crate::foundation::math::{clamp01, lerp};
use crate::model::cue::WordTiming;
use crate::preset::model::{
    AnimationProps, ClipDirection, LineTransition, MotionSpec, PropValue, Scalar,
    DEFAULT_TRANSITION_SECS,
};

/// Length of the implicit fade applied to presets without line transitions.
pub const DEFAULT_FADE_SECS: f64 = 0.3;

/// Foreshortening floor for the rotate-as-scale approximation.
const MIN_FORESHORTEN: f64 = 0.2;

const CHANNEL_COUNT: usize = 13;

/// One scalar animatable property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Opacity,
    Scale,
    ScaleX,
    ScaleY,
    X,
    Y,
    Rotate,
    RotateX,
    RotateY,
    SkewX,
    SkewY,
    LetterSpacing,
    Blur,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Opacity,
        Channel::Scale,
        Channel::ScaleX,
        Channel::ScaleY,
        Channel::X,
        Channel::Y,
        Channel::Rotate,
        Channel::RotateX,
        Channel::RotateY,
        Channel::SkewX,
        Channel::SkewY,
        Channel::LetterSpacing,
        Channel::Blur,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn prop(self, props: &AnimationProps) -> Option<&PropValue> {
        match self {
            Channel::Opacity => props.opacity.as_ref(),
            Channel::Scale => props.scale.as_ref(),
            Channel::ScaleX => props.scale_x.as_ref(),
            Channel::ScaleY => props.scale_y.as_ref(),
            Channel::X => props.x.as_ref(),
            Channel::Y => props.y.as_ref(),
            Channel::Rotate => props.rotate.as_ref(),
            Channel::RotateX => props.rotate_x.as_ref(),
            Channel::RotateY => props.rotate_y.as_ref(),
            Channel::SkewX => props.skew_x.as_ref(),
            Channel::SkewY => props.skew_y.as_ref(),
            Channel::LetterSpacing => props.letter_spacing.as_ref(),
            Channel::Blur => props.filter.as_ref(),
        }
    }

    /// Convert one stop to a number in this channel's unit.
    fn value_of(self, s: &Scalar, font_px: f64) -> Option<f64> {
        match self {
            Channel::X | Channel::Y | Channel::LetterSpacing => s.length(font_px),
            Channel::Blur => s.blur_px(),
            _ => s.number(),
        }
    }
}

/// Sampled property values; `None` means the preset did not set (or mis-set) the property.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedMotion {
    channels: [Option<f64>; CHANNEL_COUNT],
    pub shadow: Option<ShadowSpec>,
}

impl ResolvedMotion {
    pub fn get(&self, c: Channel) -> Option<f64> {
        self.channels[c.index()]
    }

    /// Fill every unset property from `base`.
    pub fn over(&self, base: &MotionState) -> MotionState {
        let mut out = base.clone();
        for c in Channel::ALL {
            if let Some(v) = self.get(c) {
                out.set(c, v);
            }
        }
        if self.shadow.is_some() {
            out.shadow = self.shadow;
        }
        out
    }
}

/// Sample every property of `props` at local progress `t`.
///
/// Keyframe tracks interpolate over evenly spaced stops; constants hold for any `t`. `em`
/// lengths are multiplied by `font_px`. A stop that does not parse drops the whole property
/// so the caller default applies.
pub fn resolve(props: &AnimationProps, t: f64, font_px: f64) -> ResolvedMotion {
    let mut out = ResolvedMotion::default();
    for c in Channel::ALL {
        out.channels[c.index()] = c.prop(props).and_then(|v| sample_channel(c, v, t, font_px));
    }
    out.shadow = props
        .text_shadow
        .as_ref()
        .and_then(|v| shadow::resolve(v.stops(), t));
    out
}

fn sample_channel(c: Channel, value: &PropValue, t: f64, font_px: f64) -> Option<f64> {
    let stops = value
        .stops()
        .iter()
        .map(|s| c.value_of(s, font_px))
        .collect::<Option<Vec<f64>>>();
    match stops {
        Some(stops) => interpolate(&stops, t),
        None => {
            tracing::debug!(channel = ?c, "malformed animation value, using default");
            None
        }
    }
}

/// Concrete transform, opacity and filter state of one element.
///
/// `x`, `y`, `letter_spacing` and `blur` are in reference pixels (1920x1080 canvas); angles
/// are degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionState {
    pub opacity: f64,
    pub scale: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub x: f64,
    pub y: f64,
    pub rotate: f64,
    pub rotate_x: f64,
    pub rotate_y: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub letter_spacing: f64,
    pub blur: f64,
    pub shadow: Option<ShadowSpec>,
}

impl Default for MotionState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl MotionState {
    pub const IDENTITY: MotionState = MotionState {
        opacity: 1.0,
        scale: 1.0,
        scale_x: 1.0,
        scale_y: 1.0,
        x: 0.0,
        y: 0.0,
        rotate: 0.0,
        rotate_x: 0.0,
        rotate_y: 0.0,
        skew_x: 0.0,
        skew_y: 0.0,
        letter_spacing: 0.0,
        blur: 0.0,
        shadow: None,
    };

    /// Identity with a different opacity.
    pub fn with_opacity(opacity: f64) -> Self {
        Self {
            opacity,
            ..Self::IDENTITY
        }
    }

    pub fn get(&self, c: Channel) -> f64 {
        match c {
            Channel::Opacity => self.opacity,
            Channel::Scale => self.scale,
            Channel::ScaleX => self.scale_x,
            Channel::ScaleY => self.scale_y,
            Channel::X => self.x,
            Channel::Y => self.y,
            Channel::Rotate => self.rotate,
            Channel::RotateX => self.rotate_x,
            Channel::RotateY => self.rotate_y,
            Channel::SkewX => self.skew_x,
            Channel::SkewY => self.skew_y,
            Channel::LetterSpacing => self.letter_spacing,
            Channel::Blur => self.blur,
        }
    }

    pub fn set(&mut self, c: Channel, v: f64) {
        let slot = match c {
            Channel::Opacity => &mut self.opacity,
            Channel::Scale => &mut self.scale,
            Channel::ScaleX => &mut self.scale_x,
            Channel::ScaleY => &mut self.scale_y,
            Channel::X => &mut self.x,
            Channel::Y => &mut self.y,
            Channel::Rotate => &mut self.rotate,
            Channel::RotateX => &mut self.rotate_x,
            Channel::RotateY => &mut self.rotate_y,
            Channel::SkewX => &mut self.skew_x,
            Channel::SkewY => &mut self.skew_y,
            Channel::LetterSpacing => &mut self.letter_spacing,
            Channel::Blur => &mut self.blur,
        };
        *slot = v;
    }

    /// Componentwise blend. `t` is not clamped so spring overshoot carries through.
    pub fn lerp(&self, to: &MotionState, t: f64) -> MotionState {
        let mut out = self.clone();
        for c in Channel::ALL {
            out.set(c, lerp(self.get(c), to.get(c), t));
        }
        out.shadow = ShadowSpec::lerp_opt(self.shadow, to.shadow, t);
        out
    }

    /// Opacity clamped to `[0, 1]`.
    pub fn alpha(&self) -> f64 {
        clamp01(self.opacity)
    }

    /// Horizontal scale with `rotateY` folded in as `max(0.2, cos)` foreshortening.
    pub fn effective_scale_x(&self) -> f64 {
        self.scale * self.scale_x * self.rotate_y.to_radians().cos().max(MIN_FORESHORTEN)
    }

    /// Vertical scale with `rotateX` folded in, see [`Self::effective_scale_x`].
    pub fn effective_scale_y(&self) -> f64 {
        self.scale * self.scale_y * self.rotate_x.to_radians().cos().max(MIN_FORESHORTEN)
    }

    /// Element-local transform around the origin: translate, rotate, skew, then scale.
    ///
    /// `offset_scale` converts the reference-pixel offsets to canvas pixels.
    pub fn affine(&self, offset_scale: f64) -> Affine {
        let skew = Affine::skew(
            self.skew_x.to_radians().tan(),
            self.skew_y.to_radians().tan(),
        );
        Affine::translate(Vec2::new(self.x * offset_scale, self.y * offset_scale))
            * Affine::rotate(self.rotate.to_radians())
            * skew
            * Affine::scale_non_uniform(self.effective_scale_x(), self.effective_scale_y())
    }

    /// `true` when drawing with this state is the same as drawing without it.
    pub fn is_identity(&self) -> bool {
        self.shadow.is_none() && Channel::ALL.iter().all(|&c| self.get(c) == Self::IDENTITY.get(c))
    }
}

fn motion_window(spec: &MotionSpec) -> f64 {
    match spec.transition.as_ref().and_then(|t| t.duration) {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => DEFAULT_TRANSITION_SECS,
    }
}

fn motion_delay(spec: &MotionSpec) -> f64 {
    spec.transition
        .as_ref()
        .and_then(|t| t.delay)
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0)
}

/// Entry state `elapsed` seconds after the line appeared, or `None` once the window is over.
///
/// Blends from `initial` (opacity defaults to 0) to `animate` (opacity defaults to 1).
pub fn line_entry_state(spec: &MotionSpec, elapsed: f64, font_px: f64) -> Option<MotionState> {
    let window = motion_window(spec);
    let local = elapsed - motion_delay(spec);
    if elapsed.is_nan() || elapsed < 0.0 || local >= window {
        return None;
    }

    let from = spec
        .initial
        .as_ref()
        .map(|p| resolve(p, 0.0, font_px))
        .unwrap_or_default()
        .over(&MotionState::with_opacity(0.0));
    let to = spec
        .animate
        .as_ref()
        .map(|p| resolve(p, 1.0, font_px))
        .unwrap_or_default()
        .over(&MotionState::IDENTITY);

    let eased = Ease::from_transition(spec.transition.as_ref()).apply(local / window);
    Some(from.lerp(&to, eased))
}

/// Exit state with `leave` seconds left before the line disappears, or `None` outside the
/// window.
///
/// Blends from identity toward the exit target (opacity defaults to 0). The target is the
/// spec's `exit` props when present, else `animate`.
pub fn line_exit_state(spec: &MotionSpec, leave: f64, font_px: f64) -> Option<MotionState> {
    let window = motion_window(spec);
    if leave.is_nan() || leave < 0.0 || leave >= window {
        return None;
    }

    let target = spec
        .exit
        .as_ref()
        .or(spec.animate.as_ref())
        .map(|p| resolve(p, 1.0, font_px))
        .unwrap_or_default()
        .over(&MotionState::with_opacity(0.0));

    let r = 1.0 - leave / window;
    let eased = Ease::from_transition(spec.transition.as_ref()).apply(r);
    Some(MotionState::IDENTITY.lerp(&target, eased))
}

/// Resting state of a non-active word.
pub fn word_inactive_state(inactive: Option<&AnimationProps>, font_px: f64) -> MotionState {
    inactive
        .map(|p| resolve(p, 1.0, font_px))
        .unwrap_or_default()
        .over(&MotionState::IDENTITY)
}

/// State of the active word at eased progress `eased_t`.
///
/// Keyframe tracks are sampled at `eased_t`. Constants blend from the inactive value toward
/// the constant without clamping, so spring overshoot passes through. Properties the active
/// spec leaves out blend from the inactive value back to identity.
pub fn word_active_state(
    active: &MotionSpec,
    inactive: Option<&AnimationProps>,
    eased_t: f64,
    font_px: f64,
) -> MotionState {
    let rest = word_inactive_state(inactive, font_px);
    let empty = AnimationProps::default();
    let animate = active.animate.as_ref().unwrap_or(&empty);

    let mut out = rest.clone();
    for c in Channel::ALL {
        let from = rest.get(c);
        let v = match c.prop(animate) {
            Some(p) if p.is_keyframes() => {
                sample_channel(c, p, eased_t, font_px).unwrap_or(from)
            }
            Some(p) => match sample_channel(c, p, 1.0, font_px) {
                Some(target) => lerp(from, target, eased_t),
                None => from,
            },
            None => lerp(from, MotionState::IDENTITY.get(c), eased_t),
        };
        out.set(c, v);
    }

    out.shadow = match animate.text_shadow.as_ref() {
        Some(PropValue::Keyframes(stops)) => shadow::resolve(stops, eased_t),
        Some(PropValue::Scalar(s)) => ShadowSpec::lerp_opt(
            rest.shadow,
            shadow::resolve(std::slice::from_ref(s), 1.0),
            eased_t,
        ),
        None => ShadowSpec::lerp_opt(rest.shadow, None, eased_t),
    };
    out
}

/// Raw progress of a word motion: tween windows use the transition duration (0.3 s default),
/// spring transitions stretch over the word's own interval.
pub fn word_motion_progress(active: &MotionSpec, word: &WordTiming, time: f64) -> f64 {
    let elapsed = time - word.start - motion_delay(active);
    let is_spring = active.transition.as_ref().is_some_and(|t| t.is_spring());
    let window = if is_spring {
        word.duration()
    } else {
        motion_window(active)
    };
    if window.is_nan() || window <= 0.0 {
        return 1.0;
    }
    clamp01(elapsed / window)
}

/// Implicit linear fade in and out over [`DEFAULT_FADE_SECS`].
pub fn default_fade_alpha(elapsed: f64, leave: f64) -> f64 {
    clamp01((elapsed / DEFAULT_FADE_SECS).min(leave / DEFAULT_FADE_SECS))
}

/// Visible part of `block` during a clip reveal.
///
/// `visible` is the revealed fraction. Entering clips grow from the edge the sweep starts
/// at; exiting clips keep the side opposite the sweep.
pub fn clip_reveal_rect(block: Rect, direction: ClipDirection, visible: f64, entering: bool) -> Rect {
    let v = clamp01(visible);
    let (w, h) = (block.width(), block.height());
    let keep_left = |r: Rect| Rect::new(r.x0, r.y0, r.x0 + w * v, r.y1);
    let keep_right = |r: Rect| Rect::new(r.x1 - w * v, r.y0, r.x1, r.y1);
    let keep_top = |r: Rect| Rect::new(r.x0, r.y0, r.x1, r.y0 + h * v);
    let keep_bottom = |r: Rect| Rect::new(r.x0, r.y1 - h * v, r.x1, r.y1);

    match (direction, entering) {
        (ClipDirection::Ltr, true) | (ClipDirection::Rtl, false) => keep_left(block),
        (ClipDirection::Rtl, true) | (ClipDirection::Ltr, false) => keep_right(block),
        (ClipDirection::Ttb, true) | (ClipDirection::Btt, false) => keep_top(block),
        (ClipDirection::Btt, true) | (ClipDirection::Ttb, false) => keep_bottom(block),
    }
}

/// Clip reveal in progress for a line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipReveal {
    pub direction: ClipDirection,
    pub visible: f64,
    pub entering: bool,
}

/// Whole-line animation state at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct LineAnimation {
    pub motion: MotionState,
    pub clip: Option<ClipReveal>,
    /// `true` while a transition window is running, so the frame depends on time.
    pub animating: bool,
}

impl LineAnimation {
    pub fn rest() -> Self {
        Self {
            motion: MotionState::IDENTITY,
            clip: None,
            animating: false,
        }
    }
}

/// Resolve line-scope transitions for a cue spanning `[start, end]` at `time`.
///
/// An exit in progress overrides the entry.
pub fn line_animation(
    entry: Option<&LineTransition>,
    exit: Option<&LineTransition>,
    start: f64,
    end: f64,
    time: f64,
    font_px: f64,
) -> LineAnimation {
    let elapsed = time - start;
    let leave = end - time;

    if let Some(exit) = exit {
        let state = match exit {
            LineTransition::LineMotion(m) => line_exit_state(m, leave, font_px).map(|s| (s, None)),
            LineTransition::LineClipReveal(c) => (leave >= 0.0 && leave < exit.window()).then(|| {
                let clip = ClipReveal {
                    direction: c.direction,
                    visible: leave / exit.window(),
                    entering: false,
                };
                (MotionState::IDENTITY, Some(clip))
            }),
        };
        if let Some((motion, clip)) = state {
            return LineAnimation {
                motion,
                clip,
                animating: true,
            };
        }
    }

    if let Some(entry) = entry {
        let state = match entry {
            LineTransition::LineMotion(m) => line_entry_state(m, elapsed, font_px).map(|s| (s, None)),
            LineTransition::LineClipReveal(c) => (elapsed >= 0.0 && elapsed < entry.window()).then(|| {
                let clip = ClipReveal {
                    direction: c.direction,
                    visible: elapsed / entry.window(),
                    entering: true,
                };
                (MotionState::IDENTITY, Some(clip))
            }),
        };
        if let Some((motion, clip)) = state {
            return LineAnimation {
                motion,
                clip,
                animating: true,
            };
        }
    }

    LineAnimation::rest()
}

#[cfg(test)]
#[path = "../../tests/unit/animation/motion.rs"]
mod tests;
