use super::*;
use std::path::PathBuf;

use crate::model::cue::WordTiming;
use crate::model::style::{DisplayMode, Position};
use crate::render::frame::FrameRGBA;

fn book() -> FontBook {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts");
    FontBook::from_dir(&dir).unwrap()
}

fn style(effect: &str) -> Style {
    Style {
        font_name: "DejaVu Sans".to_owned(),
        background_color: "transparent".to_owned(),
        effect: effect.to_owned(),
        ..Style::default()
    }
}

fn canvas() -> Canvas {
    Canvas::new(384, 216).unwrap()
}

fn preset(id: &str) -> Option<&'static EffectPreset> {
    PresetCatalog::builtin().lookup(id)
}

fn three_words() -> Cue {
    Cue::new(1, 0.0, 3.0, "one two three").with_words(vec![
        WordTiming { word: "one".into(), start: 0.0, end: 1.0 },
        WordTiming { word: "two".into(), start: 1.0, end: 2.0 },
        WordTiming { word: "three".into(), start: 2.0, end: 3.0 },
    ])
}

#[test]
fn modes_follow_priority_order() {
    let single = Style {
        display_mode: DisplayMode::SingleWord,
        ..style("typewriter")
    };
    assert_eq!(CueMode::select(&single, preset("typewriter")), CueMode::SingleWord);
    assert_eq!(CueMode::select(&style("typewriter"), preset("typewriter")), CueMode::Typewriter);
    assert_eq!(CueMode::select(&style("line_fade_up"), preset("line_fade_up")), CueMode::Line);
    assert_eq!(CueMode::select(&style("none"), None), CueMode::Line);
    assert_eq!(CueMode::select(&style("pop-in"), preset("pop-in")), CueMode::Word);
}

#[test]
fn line_entry_window_animates_then_rests() {
    let cue = Cue::new(1, 1.0, 4.0, "Hello world");
    let s = style("line_fade_up");
    let p = preset("line_fade_up");

    let start = cue_clock(&cue, &s, p, 1.0, 60.0);
    assert!(start.animating);
    assert!(start.alpha.abs() < 1e-9);
    assert!((start.line.motion.y - 14.0).abs() < 1e-9);

    let middle = cue_clock(&cue, &s, p, 2.5, 60.0);
    assert!(!middle.animating);
    assert_eq!(middle.alpha, 1.0);
    assert!(middle.line.motion.is_identity());
}

#[test]
fn unknown_effects_render_static_and_opaque() {
    let cue = Cue::new(1, 0.0, 2.0, "Hello");
    let clock = cue_clock(&cue, &style("no_such_effect"), None, 0.0, 60.0);
    assert_eq!(clock.mode, CueMode::Line);
    assert_eq!(clock.alpha, 1.0);
    assert!(!clock.animating);
}

#[test]
fn word_scope_fades_and_always_animates() {
    let cue = three_words();
    let p = preset("word_pop_soft");
    let s = style("word_pop_soft");
    let first = cue_clock(&cue, &s, p, 0.0, 60.0);
    assert_eq!(first.mode, CueMode::Word);
    assert!(first.alpha.abs() < 1e-9);
    assert!(first.animating);

    let later = cue_clock(&cue, &s, p, 1.5, 60.0);
    assert_eq!(later.alpha, 1.0);
    assert!(later.animating);
}

#[test]
fn typewriter_counts_visible_characters() {
    let cue = Cue::new(1, 0.0, 2.0, "abcdefghij");
    let s = style("typewriter");
    let p = preset("typewriter");
    assert_eq!(cue_clock(&cue, &s, p, 0.0, 60.0).visible_chars, Some(0));
    assert_eq!(cue_clock(&cue, &s, p, 1.0, 60.0).visible_chars, Some(5));
    assert_eq!(cue_clock(&cue, &s, p, 2.0, 60.0).visible_chars, Some(10));
}

#[test]
fn revealed_text_keeps_final_line_breaks() {
    let lines = vec!["the quick brown".to_owned(), "fox jumps".to_owned()];
    assert_eq!(reveal_lines(&lines, "the qu"), vec!["the qu", ""]);
    assert_eq!(reveal_lines(&lines, "the quick brown fo"), vec!["the quick brown", "fo"]);
    assert_eq!(reveal_lines(&lines, ""), vec!["", ""]);
}

#[test]
fn inactive_cues_have_no_plan() {
    let mut r = Rasterizer::new(&book()).unwrap();
    let cue = Cue::new(1, 1.0, 2.0, "Hello");
    assert!(r.plan_cue(&cue, &style("none"), 0.5, None, canvas()).unwrap().is_none());
    assert!(r.plan_cue(&cue, &style("none"), 2.5, None, canvas()).unwrap().is_none());
    assert!(r.plan_cue(&cue, &style("none"), 2.0, None, canvas()).unwrap().is_some());
}

#[test]
fn word_plan_marks_exactly_one_active_word() {
    let mut r = Rasterizer::new(&book()).unwrap();
    let cue = three_words();
    let plan = r
        .plan_cue(&cue, &style("word_pop_soft"), 1.5, preset("word_pop_soft"), canvas())
        .unwrap()
        .unwrap();
    let PlanContent::Words(words) = &plan.content else {
        panic!("expected a word plan");
    };
    assert_eq!(words.active, 1);
    assert_eq!(words.states.iter().filter(|s| s.is_active).count(), 1);
    let progress: Vec<f64> = words.states.iter().map(|s| s.progress).collect();
    assert_eq!(progress[0], 1.0);
    assert!((progress[1] - 0.5).abs() < 1e-9);
    assert_eq!(progress[2], 0.0);
    // Inactive words rest at the preset's inactive opacity.
    assert!((words.states[0].motion.opacity - 0.75).abs() < 1e-9);
    assert!(words.states[1].motion.scale > 1.0);
}

#[test]
fn single_word_mode_shows_the_spoken_word() {
    let mut r = Rasterizer::new(&book()).unwrap();
    let s = Style {
        display_mode: DisplayMode::SingleWord,
        ..style("none")
    };
    let plan = r.plan_cue(&three_words(), &s, 2.5, None, canvas()).unwrap().unwrap();
    let PlanContent::Block(block) = &plan.content else {
        panic!("expected a block plan");
    };
    assert_eq!(block.lines.len(), 1);
    assert_eq!(block.lines[0].text, "three");
}

#[test]
fn pill_migrates_from_previous_word() {
    let mut r = Rasterizer::new(&book()).unwrap();
    let cue = three_words();
    let s = style("decor_pill");
    let p = preset("decor_pill");

    let plan_at = |r: &mut Rasterizer, t: f64| {
        let plan = r.plan_cue(&cue, &s, t, p, canvas()).unwrap().unwrap();
        match plan.content {
            PlanContent::Words(w) => w,
            PlanContent::Block(_) => panic!("expected a word plan"),
        }
    };

    let at_start = plan_at(&mut r, 1.0);
    let settled = plan_at(&mut r, 1.5);
    let prev = at_start.layout.words[0].center;
    let cur = at_start.layout.words[1].center;
    let h0 = at_start.highlight.unwrap();
    let h1 = settled.highlight.unwrap();
    assert!((h0.rect.center().x - prev.x).abs() < 1e-6);
    assert!((h1.rect.center().x - cur.x).abs() < 1e-6);
    // Pill corners are fully round.
    assert!((h1.radius - h1.rect.height() / 2.0).abs() < 1e-9);
}

#[test]
fn dim_others_scales_inactive_words() {
    let mut r = Rasterizer::new(&book()).unwrap();
    let plan = r
        .plan_cue(
            &three_words(),
            &style("decor_focus_dim_others"),
            1.5,
            preset("decor_focus_dim_others"),
            canvas(),
        )
        .unwrap()
        .unwrap();
    let PlanContent::Words(words) = &plan.content else {
        panic!("expected a word plan");
    };
    assert_eq!(words.states[1].dim, 1.0);
    assert!((words.states[0].dim - 0.55).abs() < 1e-9);
    assert!((words.states[2].dim - 0.55).abs() < 1e-9);
}

#[test]
fn neon_paints_glow_without_outline() {
    let m = Metrics::new(canvas(), &style("neon"));
    let neon = TextPaint::for_block(&style("neon"), &m, None);
    let glow = neon.glow.unwrap();
    assert!((glow.blur - DEFAULT_GLOW_BLUR * m.responsive).abs() < 1e-9);
    assert!(neon.outline.is_none());

    let plain = TextPaint::for_block(&style("none"), &m, None);
    assert!(plain.glow.is_none());
    let (_, width) = plain.outline.unwrap();
    assert!((width - 2.0 * 2.0 * m.unit).abs() < 1e-9);

    let blurry = Style {
        shadow_blur: 20.0,
        ..style("none")
    };
    assert!(TextPaint::for_block(&blurry, &m, None).glow.is_some());
}

#[test]
fn render_draws_only_active_cues() {
    let mut r = Rasterizer::new(&book()).unwrap();
    let mut surface = Surface::new(canvas()).unwrap();
    let cues = vec![Cue::new(1, 0.0, 1.0, "Hello world")];

    assert_eq!(r.render(&mut surface, &cues, &style("none"), 2.0).unwrap(), 0);
    assert!(surface.snapshot().is_blank());

    assert_eq!(r.render(&mut surface, &cues, &style("none"), 0.5).unwrap(), 1);
    let frame = surface.snapshot();
    assert!(!frame.is_blank());
    // Bottom placement keeps the text in the lower part of the frame.
    let covered_top = (0..216 / 2)
        .flat_map(|y| (0..384).map(move |x| (x, y)))
        .any(|(x, y)| frame.pixel(x, y)[3] > 0);
    assert!(!covered_top);
}

#[test]
fn rendering_is_deterministic() {
    let cues = vec![three_words()];
    let s = style("word_pop_soft");
    let render = || {
        let mut r = Rasterizer::new(&book()).unwrap();
        let mut surface = Surface::new(canvas()).unwrap();
        r.render(&mut surface, &cues, &s, 1.3).unwrap();
        surface.snapshot()
    };
    let (a, b) = (render(), render());
    assert!(!a.is_blank());
    assert_eq!(a.data, b.data);
}

#[test]
fn wipe_reveals_from_the_left() {
    let mut r = Rasterizer::new(&book()).unwrap();
    let mut surface = Surface::new(canvas()).unwrap();
    let cues = vec![Cue::new(1, 0.0, 3.0, "Hello world")];
    r.render(&mut surface, &cues, &style("line_wipe_ltr"), 0.1).unwrap();
    let frame = surface.snapshot();
    assert!(!frame.is_blank());
    for y in 0..216 {
        for x in 192..384 {
            assert_eq!(frame.pixel(x, y)[3], 0, "pixel {x},{y} should still be hidden");
        }
    }
}

#[test]
fn background_box_is_drawn_behind_text() {
    let mut r = Rasterizer::new(&book()).unwrap();
    let mut surface = Surface::new(canvas()).unwrap();
    let s = Style {
        background_color: "#FF0000".to_owned(),
        ..style("none")
    };
    let cues = vec![Cue::new(1, 0.0, 1.0, "Hello world")];
    let plan = r.plan_cue(&cues[0], &s, 0.5, None, canvas()).unwrap().unwrap();
    let PlanContent::Block(block) = &plan.content else {
        panic!("expected a block plan");
    };
    let bg = block.background_rect(plan.metrics.font_px);
    r.render(&mut surface, &cues, &s, 0.5).unwrap();
    let frame = surface.snapshot();
    // Just inside the padded corner there is background and no glyph.
    let px = frame.pixel((bg.x0 + 1.5) as u32, bg.center().y as u32);
    assert_eq!(px, [255, 0, 0, 255]);
}

fn render_glyph(s: &Style) -> FrameRGBA {
    let mut r = Rasterizer::new(&book()).unwrap();
    let mut surface = Surface::new(canvas()).unwrap();
    let cues = vec![Cue::new(1, 0.0, 1.0, "I")];
    assert_eq!(r.render(&mut surface, &cues, s, 0.5).unwrap(), 1);
    surface.snapshot()
}

/// Bounding box `(x0, y0, x1, y1)` of the pixels matching `pred`.
fn bbox(frame: &FrameRGBA, pred: impl Fn([u8; 4]) -> bool) -> (u32, u32, u32, u32) {
    let mut b = (u32::MAX, u32::MAX, 0, 0);
    for y in 0..frame.height {
        for x in 0..frame.width {
            if pred(frame.pixel(x, y)) {
                b = (b.0.min(x), b.1.min(y), b.2.max(x), b.3.max(y));
            }
        }
    }
    assert!(b.0 <= b.2, "no matching pixels");
    b
}

fn is_blue(p: [u8; 4]) -> bool {
    p[3] > 200 && p[2] > 200 && p[0] < 60 && p[1] < 60
}

fn glyph_style(effect: &str) -> Style {
    Style {
        font_size: 240.0,
        position: Position::Center,
        primary_color: "#0000FF".to_owned(),
        ..style(effect)
    }
}

#[test]
fn outline_ring_sits_under_the_fill() {
    // 20px ring (10px each side) on a stem about 12px wide: painted on top it would cover the
    // whole stem.
    let s = Style {
        outline_color: "#FF0000".to_owned(),
        outline_width: 20.0,
        ..glyph_style("none")
    };
    let frame = render_glyph(&s);
    let (x0, y0, x1, y1) = bbox(&frame, |p| p[3] > 0);
    let (cx, cy) = ((x0 + x1) / 2, (y0 + y1) / 2);

    let center = frame.pixel(cx, cy);
    assert!(is_blue(center), "glyph center should keep the fill color, got {center:?}");

    for x in [x0 + 3, x1 - 3] {
        let p = frame.pixel(x, cy);
        assert!(
            p[3] > 200 && p[0] > 200 && p[2] < 60,
            "pixel {x},{cy} outside the glyph edge should be outline, got {p:?}"
        );
    }
}

#[test]
fn neon_glow_stays_beneath_the_fill() {
    let s = Style {
        shadow_color: "#00FF00".to_owned(),
        ..glyph_style("neon")
    };
    let frame = render_glyph(&s);
    let (fx0, fy0, fx1, fy1) = bbox(&frame, is_blue);
    let (cx, cy) = ((fx0 + fx1) / 2, (fy0 + fy1) / 2);

    let center = frame.pixel(cx, cy);
    assert!(is_blue(center), "glyph center should keep the fill color, got {center:?}");

    // Well past where the default outline would end.
    let m = Metrics::new(canvas(), &s);
    let outline_radius = (s.outline_width * 2.0 * m.unit / 2.0).ceil() as u32;
    for x in [fx0 - outline_radius - 6, fx1 + outline_radius + 6] {
        let p = frame.pixel(x, cy);
        assert!(p[3] > 0, "expected glow at {x},{cy}");
        assert!(!is_blue(p), "glow at {x},{cy} should not be fill colored, got {p:?}");
    }
}
