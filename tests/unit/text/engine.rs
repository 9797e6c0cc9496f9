use super::*;
use std::path::PathBuf;

fn engine() -> TextEngine {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts");
    let book = FontBook::from_dir(&dir).unwrap();
    TextEngine::new(&book).unwrap()
}

#[test]
fn faces_register_under_their_family_name() {
    let e = engine();
    assert!(e.families().all(|f| f == "DejaVu Sans"));
}

#[test]
fn weight_selects_the_closest_face() {
    let e = engine();
    let bold = e.select_face("DejaVu Sans", 700.0);
    let regular = e.select_face("DejaVu Sans", 400.0);
    assert_ne!(bold, regular);
    // Unknown families fall back to the registered faces.
    assert_eq!(e.select_face("Arial", 400.0), regular);
    assert_eq!(e.select_face("'DejaVu Sans'", 800.0), bold);
}

#[test]
fn shaping_produces_glyphs_on_the_baseline() {
    let mut e = engine();
    let face = e.select_face("DejaVu Sans", 400.0);
    let line = e.shape("Hello", face, 40.0, 0.0).unwrap();
    assert_eq!(line.glyphs.len(), 5);
    assert!(line.width > 40.0);
    assert!(line.ascent > 0.0 && line.descent > 0.0);
    assert!(line.glyphs.windows(2).all(|w| w[1].x > w[0].x));
    assert!(line.glyphs.iter().all(|g| g.y.abs() < 1e-3));
}

#[test]
fn letter_spacing_widens_the_line() {
    let mut e = engine();
    let face = e.select_face("DejaVu Sans", 400.0);
    let tight = e.measure("abcd", face, 32.0, 0.0).unwrap();
    let loose = e.measure("abcd", face, 32.0, 5.0).unwrap();
    assert!(loose > tight + 14.0);
}

#[test]
fn repeated_shapes_hit_the_cache() {
    let mut e = engine();
    let a = e.shape("cache me", 0, 24.0, 0.0).unwrap();
    let b = e.shape("cache me", 0, 24.0, 0.0).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(e.cache_stats(), (1, 1));
}

#[test]
fn invalid_sizes_are_rejected() {
    let mut e = engine();
    assert!(e.shape("x", 0, 0.0, 0.0).is_err());
    assert!(e.shape("x", 99, 12.0, 0.0).is_err());
}

#[test]
fn empty_text_has_no_width() {
    let mut e = engine();
    let line = e.shape("", 0, 24.0, 0.0).unwrap();
    assert!(line.is_empty());
    assert_eq!(line.width, 0.0);
}
