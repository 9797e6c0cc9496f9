//! Source video metadata through `ffprobe -of json`.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::foundation::core::Fps;
use crate::foundation::error::{CaptionError, CaptionResult};

/// What the render session needs to know about the source.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// `None` when the container reports no usable frame rate.
    pub fps: Option<Fps>,
    pub duration: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_rate(rate: &str) -> Option<Fps> {
    let (num, den) = rate.split_once('/').unwrap_or((rate, "1"));
    let num: u32 = num.trim().parse().ok()?;
    let den: u32 = den.trim().parse().ok()?;
    if num == 0 || den == 0 {
        return None;
    }
    Fps::new(num, den).ok()
}

fn parse_secs(s: Option<&String>) -> Option<f64> {
    s.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Parse the JSON printed by `ffprobe -show_streams -show_format -of json`.
pub fn parse_probe_json(json: &str) -> CaptionResult<VideoInfo> {
    let out: ProbeOutput =
        serde_json::from_str(json).map_err(|e| CaptionError::serde(format!("ffprobe output: {e}")))?;
    let video = out
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| CaptionError::validation("source has no video stream"))?;
    let (Some(width), Some(height)) = (video.width, video.height) else {
        return Err(CaptionError::validation("video stream has no dimensions"));
    };
    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_rate));
    let duration = parse_secs(out.format.as_ref().and_then(|f| f.duration.as_ref()))
        .or_else(|| parse_secs(video.duration.as_ref()));
    Ok(VideoInfo {
        width,
        height,
        fps,
        duration,
    })
}

/// Run `ffprobe` on `source`.
#[tracing::instrument(skip_all, fields(source = %source.display()))]
pub fn probe(ffprobe: &Path, source: &Path) -> CaptionResult<VideoInfo> {
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-show_streams", "-show_format", "-of", "json"])
        .arg(source)
        .output()
        .map_err(|e| {
            CaptionError::validation(format!(
                "failed to run '{}' (is it installed?): {e}",
                ffprobe.display()
            ))
        })?;
    if !output.status.success() {
        return Err(CaptionError::validation(format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let info = parse_probe_json(&String::from_utf8_lossy(&output.stdout))?;
    tracing::debug!(?info, "probed source");
    Ok(info)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/probe.rs"]
mod tests;
