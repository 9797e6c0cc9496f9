use super::*;
use std::path::PathBuf;

use crate::model::style::DisplayMode;
use crate::text::fonts::FontBook;

fn engine() -> TextEngine {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts");
    TextEngine::new(&FontBook::from_dir(&dir).unwrap()).unwrap()
}

fn params(e: &TextEngine, size: f32) -> ShapeParams {
    ShapeParams {
        face: e.select_face("DejaVu Sans", 400.0),
        size_px: size,
        spacing: 0.0,
    }
}

#[test]
fn metrics_scale_with_the_canvas() {
    let style = Style::default();
    let fhd = Metrics::new(Canvas::new(1920, 1080).unwrap(), &style);
    assert_eq!(fhd.responsive, 1.0);
    assert_eq!(fhd.font_px, 60.0);
    assert_eq!(fhd.line_height, 72.0);
    assert!((fhd.max_width - 1632.0).abs() < 1e-9);

    let hd = Metrics::new(Canvas::new(960, 540).unwrap(), &style);
    assert_eq!(hd.font_px, 30.0);
    assert_eq!(hd.reference_font_px, fhd.reference_font_px);

    let portrait = Metrics::new(Canvas::new(1080, 1920).unwrap(), &style);
    assert!((portrait.responsive - 0.5625).abs() < 1e-12);
}

#[test]
fn short_text_stays_on_one_line() {
    let mut e = engine();
    let p = params(&e, 20.0);
    let lines = wrap_text(&mut e, "  Hello   World ", p, 1000.0).unwrap();
    assert_eq!(lines, ["Hello World"]);
    assert!(wrap_text(&mut e, "   ", p, 1000.0).unwrap().is_empty());
}

#[test]
fn long_text_wraps_greedily_below_the_limit() {
    let mut e = engine();
    let p = params(&e, 20.0);
    let text = "one two three four five six seven eight nine ten";
    let limit = 120.0;
    let lines = wrap_text(&mut e, text, p, limit).unwrap();
    assert!(lines.len() > 1);
    assert_eq!(lines.join(" "), text);
    for line in &lines {
        if line.contains(' ') {
            assert!(e.measure(line, p.face, p.size_px, 0.0).unwrap() < limit);
        }
    }
}

#[test]
fn overlong_word_keeps_its_own_line() {
    let mut e = engine();
    let p = params(&e, 20.0);
    let lines = wrap_text(&mut e, "a supercalifragilistic b", p, 60.0).unwrap();
    assert_eq!(lines, ["a", "supercalifragilistic", "b"]);
}

#[test]
fn anchors_follow_position_and_line_count() {
    let canvas = Canvas::new(1920, 1080).unwrap();
    let mut style = Style::default();
    let m = Metrics::new(canvas, &style);

    let one = anchor(canvas, &style, &m, 1);
    assert_eq!(one, Point::new(960.0, 1080.0 - 250.0));
    let three = anchor(canvas, &style, &m, 3);
    assert_eq!(three.y, one.y - 2.0 * m.line_height);

    style.position = Position::Top;
    assert_eq!(anchor(canvas, &style, &m, 3).y, 250.0);

    style.position = Position::Center;
    assert_eq!(anchor(canvas, &style, &m, 2).y, 540.0 - m.line_height / 2.0);
}

#[test]
fn block_lines_are_centered_and_stacked() {
    let mut e = engine();
    let p = params(&e, 30.0);
    let lines = vec!["Hi".to_owned(), "Hello there".to_owned()];
    let block = layout_block(&mut e, &lines, p, Point::new(500.0, 300.0), 36.0).unwrap();

    assert_eq!(block.lines.len(), 2);
    for l in &block.lines {
        assert!((l.left + l.shaped.width / 2.0 - 500.0).abs() < 1e-9);
    }
    assert_eq!(block.lines[1].middle_y - block.lines[0].middle_y, 36.0);
    assert_eq!(block.text_width, block.lines[1].shaped.width);
    assert_eq!(block.center(), Point::new(500.0, 318.0));

    let r = block.rect();
    assert!((r.height() - 72.0).abs() < 1e-9);
    let bg = block.background_rect(30.0);
    assert!((bg.width() - (r.width() + 30.0)).abs() < 1e-9);
    assert!((bg.height() - (r.height() + 12.0)).abs() < 1e-9);
}

#[test]
fn words_are_spaced_by_the_gap() {
    let mut e = engine();
    let canvas = Canvas::new(1920, 1080).unwrap();
    let style = Style::default();
    let m = Metrics::new(canvas, &style);
    let p = params(&e, m.font_px as f32);
    let layout = layout_words(&mut e, &["Hello", "World"], p, 16.0, canvas, &style, &m).unwrap();

    assert_eq!(layout.rows, 1);
    let (a, b) = (&layout.words[0], &layout.words[1]);
    let right_of_a = a.center.x + a.width() / 2.0;
    let left_of_b = b.center.x - b.width() / 2.0;
    assert!((left_of_b - right_of_a - 16.0).abs() < 1e-9);
    let mid = (a.center.x - a.width() / 2.0 + b.center.x + b.width() / 2.0) / 2.0;
    assert!((mid - 960.0).abs() < 1e-9);
    assert_eq!(a.center.y, layout.anchor.y);
}

#[test]
fn words_wrap_into_rows() {
    let mut e = engine();
    let canvas = Canvas::new(400, 400).unwrap();
    let style = Style {
        display_mode: DisplayMode::Standard,
        ..Style::default()
    };
    let m = Metrics::new(canvas, &style);
    let p = params(&e, m.font_px as f32);
    let tokens = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa", "lambda", "omicron"];
    let layout = layout_words(&mut e, &tokens, p, 8.0, canvas, &style, &m).unwrap();

    assert!(layout.rows > 1);
    assert_eq!(layout.words.len(), tokens.len());
    assert!(layout.words.windows(2).all(|w| w[0].row <= w[1].row));
    let last = layout.words.last().unwrap();
    assert_eq!(last.center.y, layout.anchor.y + (layout.rows - 1) as f64 * m.line_height);
    assert!(layout.rect(m.font_px).width() <= m.max_width + 1e-9);
}
