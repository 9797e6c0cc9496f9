use super::*;
use crate::preset::model::{Scope, ToggleDecor, WordActive};

#[test]
fn builtin_catalog_parses_completely() {
    let c = PresetCatalog::builtin();
    assert_eq!(c.len(), 64);
    assert!(c.lookup("word_pop_soft").is_some());
    assert!(c.lookup("line_wipe_btt").is_some());
    assert!(c.lookup("decor_backdrop_blur").is_some());
}

#[test]
fn legacy_aliases_resolve_before_ids() {
    let c = PresetCatalog::builtin();
    assert_eq!(c.resolve_id("karaoke"), "prog_fill_ltr");
    assert_eq!(c.lookup("pop-in").unwrap().id, "word_pop_soft");
    assert_eq!(c.lookup("highlight").unwrap().id, "decor_box");
    assert_eq!(c.resolve_id("line_fade_up"), "line_fade_up");
}

#[test]
fn unknown_and_none_ids_are_absent() {
    let c = PresetCatalog::builtin();
    assert!(c.lookup("none").is_none());
    assert!(c.lookup("neon").is_none());
    assert!(c.lookup("does-not-exist").is_none());
}

#[test]
fn focus_dim_is_word_scoped() {
    let p = PresetCatalog::builtin().lookup("decor_focus_dim_others").unwrap();
    assert_eq!(p.scope, Scope::Word);
    assert!(matches!(
        p.active,
        Some(WordActive::WordDecorToggle(ref d)) if d.decor == ToggleDecor::DimOthers
    ));
}

#[test]
fn typewriter_is_a_bare_line_preset() {
    let p = PresetCatalog::builtin().lookup("typewriter").unwrap();
    assert_eq!(p.scope, Scope::Line);
    assert!(p.entry.is_none() && p.exit.is_none());
}

#[test]
fn external_catalogs_are_validated() {
    let ok = PresetCatalog::from_json(
        r#"{"presets":[{"id":"a","name":"A","scope":"line"}],"aliases":{"b":"a"}}"#,
    )
    .unwrap();
    assert_eq!(ok.lookup("b").unwrap().id, "a");

    let dup = PresetCatalog::from_json(
        r#"{"presets":[{"id":"a","name":"A","scope":"line"},{"id":"a","name":"B","scope":"word"}]}"#,
    );
    assert!(dup.is_err());

    let dangling =
        PresetCatalog::from_json(r#"{"presets":[],"aliases":{"b":"missing"}}"#).unwrap_err();
    assert!(dangling.to_string().contains("missing"));

    assert!(PresetCatalog::from_json("{").is_err());
}
