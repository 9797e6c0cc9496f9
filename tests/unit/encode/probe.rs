use super::*;

const SAMPLE: &str = r#"{
  "streams": [
    {"index": 0, "codec_type": "audio", "sample_rate": "48000"},
    {"index": 1, "codec_type": "video", "width": 1920, "height": 1080,
     "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001", "duration": "9.9"}
  ],
  "format": {"duration": "10.010000", "format_name": "mov,mp4"}
}"#;

#[test]
fn picks_the_video_stream() {
    let info = parse_probe_json(SAMPLE).unwrap();
    assert_eq!((info.width, info.height), (1920, 1080));
    assert_eq!(info.fps, Some(Fps::new(30000, 1001).unwrap()));
    assert!((info.duration.unwrap() - 10.01).abs() < 1e-9);
}

#[test]
fn zero_rates_mean_unknown_fps() {
    let json = r#"{"streams":[{"codec_type":"video","width":2,"height":2,
        "r_frame_rate":"0/0","avg_frame_rate":"0/0"}]}"#;
    let info = parse_probe_json(json).unwrap();
    assert_eq!(info.fps, None);
    assert_eq!(info.duration, None);
}

#[test]
fn falls_back_to_stream_duration_and_real_rate() {
    let json = r#"{"streams":[{"codec_type":"video","width":4,"height":4,
        "r_frame_rate":"25/1","avg_frame_rate":"0/0","duration":"3.5"}],
        "format":{"duration":"N/A"}}"#;
    let info = parse_probe_json(json).unwrap();
    assert_eq!(info.fps, Some(Fps::new(25, 1).unwrap()));
    assert_eq!(info.duration, Some(3.5));
}

#[test]
fn rejects_audio_only_and_garbage() {
    let audio = r#"{"streams":[{"codec_type":"audio"}]}"#;
    assert!(matches!(
        parse_probe_json(audio).unwrap_err(),
        CaptionError::Validation(_)
    ));
    assert!(matches!(
        parse_probe_json("not json").unwrap_err(),
        CaptionError::Serde(_)
    ));
}
