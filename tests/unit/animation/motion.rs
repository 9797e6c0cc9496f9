use super::*;
use crate::preset::PresetCatalog;
use crate::preset::model::WordActive;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn props(json: &str) -> AnimationProps {
    serde_json::from_str(json).unwrap_or_else(|e| panic!("props: {e}"))
}

fn line_motion(id: &str, exit: bool) -> MotionSpec {
    let preset = PresetCatalog::builtin()
        .lookup(id)
        .unwrap_or_else(|| panic!("missing preset {id}"));
    let slot = if exit { &preset.exit } else { &preset.entry };
    match slot {
        Some(LineTransition::LineMotion(m)) => m.clone(),
        other => panic!("{id}: expected line motion, got {other:?}"),
    }
}

fn word_motion(id: &str) -> (MotionSpec, Option<AnimationProps>) {
    let preset = PresetCatalog::builtin()
        .lookup(id)
        .unwrap_or_else(|| panic!("missing preset {id}"));
    match &preset.active {
        Some(WordActive::WordMotion(m)) => (m.clone(), preset.inactive.clone()),
        other => panic!("{id}: expected word motion, got {other:?}"),
    }
}

#[test]
fn resolve_samples_keyframes_and_converts_units() {
    let p = props(r#"{"scale":[1,1.2,1],"letterSpacing":"0.1em","rotate":"12deg","filter":"blur(8px)"}"#);
    let r = resolve(&p, 0.5, 60.0);
    assert!(close(r.get(Channel::Scale).unwrap_or_default(), 1.2));
    assert!(close(r.get(Channel::LetterSpacing).unwrap_or_default(), 6.0));
    assert_eq!(r.get(Channel::Rotate), Some(12.0));
    assert_eq!(r.get(Channel::Blur), Some(8.0));
    assert_eq!(r.get(Channel::Opacity), None);
}

#[test]
fn malformed_values_fall_back_to_the_caller_default() {
    let p = props(r#"{"opacity":"half","scale":[1,"big"]}"#);
    let r = resolve(&p, 0.5, 60.0);
    assert_eq!(r.get(Channel::Opacity), None);
    assert_eq!(r.get(Channel::Scale), None);
    let state = r.over(&MotionState::with_opacity(0.4));
    assert_eq!(state.opacity, 0.4);
    assert_eq!(state.scale, 1.0);
}

#[test]
fn rotation_folds_into_scale_with_a_floor() {
    let mut s = MotionState::IDENTITY;
    s.rotate_y = 60.0;
    assert!(close(s.effective_scale_x(), 0.5));
    assert!(close(s.effective_scale_y(), 1.0));
    s.rotate_x = 90.0;
    assert!(close(s.effective_scale_y(), 0.2));
    s.scale = 2.0;
    s.scale_x = 1.5;
    assert!(close(s.effective_scale_x(), 1.5));
}

#[test]
fn affine_applies_offset_scale_to_translation_only() {
    let mut s = MotionState::IDENTITY;
    s.x = 10.0;
    s.y = -4.0;
    s.scale = 2.0;
    let a = s.affine(0.5);
    let p = a * kurbo::Point::new(1.0, 1.0);
    assert!(close(p.x, 7.0));
    assert!(close(p.y, 0.0));
    assert_eq!(MotionState::IDENTITY.affine(1.0), Affine::IDENTITY);
}

#[test]
fn line_entry_blends_initial_to_animate_within_window() {
    let spec = line_motion("line_fade_up", false);
    let start = line_entry_state(&spec, 0.0, 60.0).unwrap_or_else(|| panic!("start"));
    assert_eq!(start.opacity, 0.0);
    assert_eq!(start.y, 14.0);

    let mid = line_entry_state(&spec, 0.225, 60.0).unwrap_or_else(|| panic!("mid"));
    let eased = Ease::EaseOut.apply(0.5);
    assert!(close(mid.opacity, eased));
    assert!(close(mid.y, 14.0 * (1.0 - eased)));

    assert_eq!(line_entry_state(&spec, 0.45, 60.0), None);
    assert_eq!(line_entry_state(&spec, -0.1, 60.0), None);
}

#[test]
fn line_entry_opacity_defaults_to_zero_then_one() {
    let spec: MotionSpec = serde_json::from_str(r#"{"initial":{"y":10},"animate":{"y":0}}"#)
        .unwrap_or_else(|e| panic!("{e}"));
    let s = line_entry_state(&spec, 0.15, 60.0).unwrap_or_else(|| panic!("state"));
    assert!(close(s.opacity, 0.5));
    assert!(close(s.y, 5.0));
}

#[test]
fn line_exit_moves_from_identity_to_target() {
    let spec = line_motion("line_fade_up", true);
    assert_eq!(line_exit_state(&spec, 0.35, 60.0), None);
    let half = line_exit_state(&spec, 0.175, 60.0).unwrap_or_else(|| panic!("half"));
    assert!(close(half.opacity, 0.5));
    assert!(close(half.y, 7.0));
    let end = line_exit_state(&spec, 0.0, 60.0).unwrap_or_else(|| panic!("end"));
    assert_eq!(end.opacity, 0.0);
    assert!(close(end.y, 14.0));
}

#[test]
fn exit_overrides_entry_on_short_cues() {
    let preset = PresetCatalog::builtin()
        .lookup("line_fade_up")
        .unwrap_or_else(|| panic!("preset"));
    // 0.4 s cue: at 0.2 s both windows are open.
    let a = line_animation(preset.entry.as_ref(), preset.exit.as_ref(), 0.0, 0.4, 0.2, 60.0);
    let exit_only = line_exit_state(&line_motion("line_fade_up", true), 0.2, 60.0);
    assert_eq!(Some(a.motion), exit_only);
    assert!(a.animating);

    let rest = line_animation(preset.entry.as_ref(), preset.exit.as_ref(), 0.0, 4.0, 2.0, 60.0);
    assert_eq!(rest, LineAnimation::rest());
}

#[test]
fn clip_reveal_line_animation_reports_visible_fraction() {
    let preset = PresetCatalog::builtin()
        .lookup("line_wipe_ltr")
        .unwrap_or_else(|| panic!("preset"));
    let a = line_animation(preset.entry.as_ref(), preset.exit.as_ref(), 1.0, 3.0, 1.25, 60.0);
    let clip = a.clip.unwrap_or_else(|| panic!("clip"));
    assert_eq!(clip.direction, ClipDirection::Ltr);
    assert!(clip.entering);
    assert!(close(clip.visible, 0.5));
}

#[test]
fn clip_rects_anchor_on_the_expected_edges() {
    let block = Rect::new(10.0, 20.0, 110.0, 60.0);
    let q = 0.25;
    assert_eq!(clip_reveal_rect(block, ClipDirection::Ltr, q, true), Rect::new(10.0, 20.0, 35.0, 60.0));
    assert_eq!(clip_reveal_rect(block, ClipDirection::Rtl, q, true), Rect::new(85.0, 20.0, 110.0, 60.0));
    assert_eq!(clip_reveal_rect(block, ClipDirection::Ttb, q, true), Rect::new(10.0, 20.0, 110.0, 30.0));
    assert_eq!(clip_reveal_rect(block, ClipDirection::Btt, q, true), Rect::new(10.0, 50.0, 110.0, 60.0));

    assert_eq!(clip_reveal_rect(block, ClipDirection::Ltr, q, false), Rect::new(85.0, 20.0, 110.0, 60.0));
    assert_eq!(clip_reveal_rect(block, ClipDirection::Rtl, q, false), Rect::new(10.0, 20.0, 35.0, 60.0));
    assert_eq!(clip_reveal_rect(block, ClipDirection::Ttb, q, false), Rect::new(10.0, 50.0, 110.0, 60.0));
    assert_eq!(clip_reveal_rect(block, ClipDirection::Btt, q, false), Rect::new(10.0, 20.0, 110.0, 30.0));

    assert_eq!(clip_reveal_rect(block, ClipDirection::Ltr, 1.0, true), block);
}

#[test]
fn active_word_blends_from_inactive_rest() {
    let (spec, inactive) = word_motion("word_pop_soft");
    let rest = word_active_state(&spec, inactive.as_ref(), 0.0, 60.0);
    assert!(close(rest.opacity, 0.75));
    assert!(close(rest.scale, 1.0));

    let full = word_active_state(&spec, inactive.as_ref(), 1.0, 60.0);
    assert!(close(full.opacity, 1.0));
    assert!(close(full.scale, 1.15));
    assert!(close(full.y, -3.0));
}

#[test]
fn scalar_targets_pass_spring_overshoot_through() {
    let (spec, inactive) = word_motion("word_pop_soft");
    let s = word_active_state(&spec, inactive.as_ref(), 1.1, 60.0);
    assert!(s.scale > 1.15);
}

#[test]
fn keyframes_sample_at_eased_progress_and_absent_props_return_to_identity() {
    let (spec, inactive) = word_motion("word_pulse");
    let s = word_active_state(&spec, inactive.as_ref(), 0.5, 60.0);
    assert!(close(s.scale, 1.15));
    assert!(close(s.opacity, 0.89));
    let done = word_active_state(&spec, inactive.as_ref(), 1.0, 60.0);
    assert!(close(done.scale, 1.0));
    assert!(close(done.opacity, 1.0));
}

#[test]
fn glow_track_interpolates_shadow() {
    let (spec, inactive) = word_motion("word_glow_pulse");
    let s = word_active_state(&spec, inactive.as_ref(), 0.5, 60.0);
    let shadow = s.shadow.unwrap_or_else(|| panic!("shadow"));
    assert!(close(shadow.blur, 20.0));
    assert!(close(shadow.color.a, 0.7));
}

#[test]
fn inactive_state_defaults_to_identity() {
    assert_eq!(word_inactive_state(None, 60.0), MotionState::IDENTITY);
    let p = props(r#"{"opacity":0.78}"#);
    assert!(close(word_inactive_state(Some(&p), 60.0).opacity, 0.78));
}

#[test]
fn word_progress_windows() {
    let word = WordTiming {
        word: "hi".to_owned(),
        start: 1.0,
        end: 2.0,
    };
    let (spring, _) = word_motion("word_pop_soft");
    assert!(close(word_motion_progress(&spring, &word, 1.5), 0.5));
    let (tween, _) = word_motion("word_pulse");
    assert!(close(word_motion_progress(&tween, &word, 1.2), 0.5));
    assert_eq!(word_motion_progress(&tween, &word, 1.9), 1.0);
    assert_eq!(word_motion_progress(&tween, &word, 0.5), 0.0);
}

#[test]
fn default_fade_ramps_both_ends() {
    assert_eq!(default_fade_alpha(0.0, 2.0), 0.0);
    assert!(close(default_fade_alpha(0.15, 2.0), 0.5));
    assert_eq!(default_fade_alpha(1.0, 1.0), 1.0);
    assert!(close(default_fade_alpha(1.0, 0.06), 0.2));
}
