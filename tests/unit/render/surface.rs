use super::*;
use std::path::PathBuf;

use crate::text::engine::TextEngine;
use crate::text::fonts::FontBook;

fn surface(w: u32, h: u32) -> Surface {
    Surface::new(Canvas::new(w, h).unwrap()).unwrap()
}

fn alpha_at(s: &Surface, x: u32, y: u32) -> u8 {
    s.snapshot().pixel(x, y)[3]
}

#[test]
fn filled_rect_covers_its_pixels_only() {
    let mut s = surface(32, 16);
    s.layer(LayerStyle::default(), |p| {
        p.fill_rect(Rect::new(4.0, 4.0, 12.0, 12.0), Rgba::WHITE);
        Ok(())
    })
    .unwrap();
    assert_eq!(s.snapshot().pixel(8, 8), [255, 255, 255, 255]);
    assert_eq!(alpha_at(&s, 20, 8), 0);
    assert_eq!(s.layers_drawn(), 1);
}

#[test]
fn zero_opacity_and_empty_layers_are_skipped() {
    let mut s = surface(16, 16);
    s.layer(LayerStyle::with_opacity(0.0), |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 16.0, 16.0), Rgba::WHITE);
        Ok(())
    })
    .unwrap();
    s.layer(LayerStyle::default(), |_| Ok(())).unwrap();
    assert!(s.snapshot().is_blank());
    assert_eq!(s.layers_drawn(), 0);
}

#[test]
fn layer_opacity_scales_coverage() {
    let mut s = surface(8, 8);
    s.layer(LayerStyle::with_opacity(0.5), |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Rgba::WHITE);
        Ok(())
    })
    .unwrap();
    let a = alpha_at(&s, 4, 4);
    assert!((126..=129).contains(&a), "alpha {a}");
}

#[test]
fn blur_spreads_past_the_drawn_rect() {
    let mut s = surface(48, 48);
    s.layer(LayerStyle::default().blurred(3.0), |p| {
        p.fill_rect(Rect::new(20.0, 20.0, 28.0, 28.0), Rgba::WHITE);
        Ok(())
    })
    .unwrap();
    assert!(alpha_at(&s, 17, 24) > 0);
    assert!(alpha_at(&s, 24, 24) < 255);
}

#[test]
fn screen_layers_brighten_without_darkening() {
    let mut s = surface(8, 8);
    s.layer(LayerStyle::default(), |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Rgba::rgba(0.5, 0.0, 0.0, 1.0));
        Ok(())
    })
    .unwrap();
    let before = s.snapshot().pixel(4, 4);
    s.layer(LayerStyle::default().screen(), |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 8.0, 8.0), Rgba::rgba(0.0, 0.5, 0.0, 1.0));
        Ok(())
    })
    .unwrap();
    let after = s.snapshot().pixel(4, 4);
    assert_eq!(after[0], before[0]);
    assert!(after[1] > before[1]);
}

#[test]
fn clip_limits_drawing() {
    let mut s = surface(20, 10);
    s.layer(LayerStyle::default(), |p| {
        p.push_clip(Rect::new(0.0, 0.0, 10.0, 10.0));
        p.fill_rect(Rect::new(0.0, 0.0, 20.0, 10.0), Rgba::WHITE);
        p.pop_layer();
        Ok(())
    })
    .unwrap();
    assert_eq!(alpha_at(&s, 5, 5), 255);
    assert_eq!(alpha_at(&s, 15, 5), 0);
}

#[test]
fn glyphs_render_near_their_origin() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts");
    let mut engine = TextEngine::new(&FontBook::from_dir(&dir).unwrap()).unwrap();
    let face = engine.select_face("DejaVu Sans", 400.0);
    let line = engine.shape("Hi", face, 24.0, 0.0).unwrap();

    let mut s = surface(64, 32);
    s.layer(LayerStyle::default(), |p| {
        p.fill_glyphs(&line, Point::new(4.0, 24.0), Rgba::WHITE);
        p.stroke_glyphs(&line, Point::new(4.0, 24.0), Rgba::BLACK, 2.0, Join::Round);
        Ok(())
    })
    .unwrap();
    let frame = s.snapshot();
    assert!(frame.covered_pixels() > 20);
    for y in 0..32 {
        for x in (line.width as u32 + 12)..64 {
            assert_eq!(frame.pixel(x, y)[3], 0);
        }
    }
}

#[test]
fn clear_and_snapshot_are_independent() {
    let mut s = surface(4, 4);
    s.layer(LayerStyle::default(), |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Rgba::WHITE);
        Ok(())
    })
    .unwrap();
    let snap = s.snapshot();
    s.clear();
    assert!(!snap.is_blank());
    assert!(s.snapshot().is_blank());
}

#[test]
fn draw_errors_propagate() {
    let mut s = surface(4, 4);
    let err = s
        .layer(LayerStyle::default(), |_| Err(CaptionError::render("boom")))
        .unwrap_err();
    assert!(err.to_string().contains("boom"));
}

#[test]
fn earlier_layers_do_not_leak_into_later_ones() {
    let mut s = surface(32, 16);
    s.layer(LayerStyle::default().blurred(2.0), |p| {
        p.fill_rect(Rect::new(12.0, 4.0, 20.0, 12.0), Rgba::WHITE);
        Ok(())
    })
    .unwrap();
    assert!(alpha_at(&s, 16, 8) > 0);
    s.clear();

    // Bounds of the second layer span the first one without painting over it.
    s.layer(LayerStyle::default(), |p| {
        p.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Rgba::WHITE);
        p.fill_rect(Rect::new(30.0, 14.0, 32.0, 16.0), Rgba::WHITE);
        Ok(())
    })
    .unwrap();
    assert_eq!(alpha_at(&s, 16, 8), 0);
    assert_eq!(alpha_at(&s, 10, 6), 0);
    assert_eq!(alpha_at(&s, 1, 1), 255);
    assert_eq!(s.layers_drawn(), 2);
}
