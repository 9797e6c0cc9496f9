use super::*;

use std::collections::HashMap;

const JOB: &str = r##"{
  "source": "clips/in.mp4",
  "output": "/renders/out.mp4",
  "cues": [
    {"id": 1, "startTime": 0.0, "endTime": 1.5, "text": "hello world"},
    {"id": "b", "startTime": 1.5, "endTime": 3.0, "text": "second line",
     "styleOverride": {"primaryColor": "#FF0000"}}
  ],
  "style": {"fontName": "DejaVu Sans", "fontSize": 48, "effect": "word_pop_soft"},
  "options": {"fps": "30000/1001", "preset": "9:16", "workers": 3,
              "fonts": ["fonts/a.ttf"], "encoder": {"crf": 22}}
}"##;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |k: &str| map.get(k).cloned()
}

#[test]
fn parses_a_job_file() {
    let job = RenderJob::from_json(JOB).unwrap();
    assert_eq!(job.cues.len(), 2);
    assert_eq!(job.style.font_size, 48.0);
    assert_eq!(job.style.effect, "word_pop_soft");
    assert_eq!(job.options.preset, Some(FramePreset::Portrait));
    assert_eq!(job.options.encoder.crf, 22);
    assert_eq!(job.options.encoder.codec, "libx264");

    let opts = job.render_options(&EnvOverrides::default()).unwrap();
    assert_eq!(opts.fps, Some(Fps::new(30000, 1001).unwrap()));
    assert_eq!(opts.workers, Some(3));
}

#[test]
fn numeric_fps_and_defaults() {
    let job = RenderJob::from_json(
        r#"{"source":"a.mp4","output":"b.mp4","cues":[],"options":{"fps":29.97}}"#,
    )
    .unwrap();
    assert_eq!(job.style, Style::default());
    let opts = job.render_options(&EnvOverrides::default()).unwrap();
    assert_eq!(opts.fps, Some(Fps::new(30000, 1001).unwrap()));
}

#[test]
fn unknown_options_and_bad_presets_are_rejected() {
    let typo = r#"{"source":"a","output":"b","cues":[],"options":{"wokers":2}}"#;
    assert!(matches!(RenderJob::from_json(typo), Err(CaptionError::Serde(_))));
    let preset = r#"{"source":"a","output":"b","cues":[],"options":{"preset":"8k"}}"#;
    assert!(RenderJob::from_json(preset).is_err());
}

#[test]
fn load_rebases_relative_paths() {
    let dir = std::env::temp_dir().join(format!("captionflow-job-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("job.json");
    std::fs::write(&path, JOB).unwrap();

    let job = RenderJob::load(&path).unwrap();
    assert_eq!(job.source, dir.join("clips/in.mp4"));
    assert_eq!(job.output, PathBuf::from("/renders/out.mp4"));
    assert_eq!(job.options.fonts, vec![dir.join("fonts/a.ttf")]);
    std::fs::remove_dir_all(&dir).unwrap();

    let err = RenderJob::load(&dir.join("missing.json")).unwrap_err();
    assert!(err.to_string().contains("failed to read job file"));
}

#[test]
fn env_overrides_validate_and_apply() {
    let fonts = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/fonts");
    let fonts_str = fonts.to_string_lossy().into_owned();
    let e = EnvOverrides::from_lookup(env(&[
        (ENV_WORKERS, "6"),
        (ENV_FONT_DIR, &fonts_str),
        (ENV_FFMPEG, "/opt/ff/bin/ffmpeg"),
    ]))
    .unwrap();
    assert_eq!(e.workers, Some(6));

    let job = RenderJob::from_json(JOB).unwrap();
    let opts = job.render_options(&e).unwrap();
    assert_eq!(opts.workers, Some(6));
    assert_eq!(opts.font_dir, Some(fonts));
    assert_eq!(opts.encoder.ffmpeg, Some(PathBuf::from("/opt/ff/bin/ffmpeg")));
    assert_eq!(
        opts.ffprobe,
        Some(PathBuf::from(format!("/opt/ff/bin/ffprobe{}", std::env::consts::EXE_SUFFIX)))
    );
}

#[test]
fn env_rejects_invalid_values() {
    assert!(EnvOverrides::from_lookup(env(&[(ENV_WORKERS, "0")])).is_err());
    assert!(EnvOverrides::from_lookup(env(&[(ENV_WORKERS, "many")])).is_err());
    assert!(EnvOverrides::from_lookup(env(&[(ENV_FONT_DIR, "/nonexistent/fonts")])).is_err());
    let blank = EnvOverrides::from_lookup(env(&[(ENV_WORKERS, "  ")])).unwrap();
    assert_eq!(blank, EnvOverrides::default());
}
