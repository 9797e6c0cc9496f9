//! Render job files and environment overrides.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::encode::ffmpeg::EncoderOptions;
use crate::foundation::core::Fps;
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::model::cue::Cue;
use crate::model::style::Style;
use crate::session::{FramePreset, RenderOptions};

pub const ENV_WORKERS: &str = "CAPTIONFLOW_WORKERS";
pub const ENV_FONT_DIR: &str = "CAPTIONFLOW_FONT_DIR";
pub const ENV_FFMPEG: &str = "CAPTIONFLOW_FFMPEG";

/// Frame rate as written in a job file: `30`, `29.97` or `"30000/1001"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FpsValue {
    Number(f64),
    Text(String),
}

impl FpsValue {
    pub fn resolve(&self) -> CaptionResult<Fps> {
        match self {
            Self::Number(n) => Fps::from_f64(*n),
            Self::Text(s) => Fps::parse(s),
        }
    }
}

/// `options` block of a job file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct JobOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<FpsValue>,
    pub duration: Option<f64>,
    pub preset: Option<FramePreset>,
    pub workers: Option<usize>,
    pub batch_frames: Option<u64>,
    pub fonts: Vec<PathBuf>,
    pub encoder: EncoderOptions,
}

/// A complete render request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub cues: Vec<Cue>,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub options: JobOptions,
}

impl RenderJob {
    pub fn from_json(json: &str) -> CaptionResult<Self> {
        serde_json::from_str(json).map_err(|e| CaptionError::serde(format!("render job: {e}")))
    }

    /// Load a job file. Relative paths inside it resolve against the file's directory.
    pub fn load(path: &Path) -> CaptionResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job file '{}'", path.display()))?;
        let mut job = Self::from_json(&text)?;
        if let Some(base) = path.parent() {
            job.rebase(base);
        }
        Ok(job)
    }

    fn rebase(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.source);
        fix(&mut self.output);
        self.options.fonts.iter_mut().for_each(fix);
    }

    /// Session options for this job with `env` applied on top.
    pub fn render_options(&self, env: &EnvOverrides) -> CaptionResult<RenderOptions> {
        let o = &self.options;
        let mut out = RenderOptions {
            width: o.width,
            height: o.height,
            fps: o.fps.as_ref().map(FpsValue::resolve).transpose()?,
            duration: o.duration,
            preset: o.preset,
            workers: o.workers,
            batch_frames: o.batch_frames,
            encoder: o.encoder.clone(),
            fonts: o.fonts.clone(),
            ..RenderOptions::default()
        };
        env.apply(&mut out);
        Ok(out)
    }
}

/// Process-level settings read from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub workers: Option<usize>,
    pub font_dir: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> CaptionResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Read the overrides through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> CaptionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let workers = get(ENV_WORKERS)
            .map(|v| {
                v.parse::<usize>().ok().filter(|&n| n > 0).ok_or_else(|| {
                    CaptionError::validation(format!("{ENV_WORKERS} must be a positive integer, got \"{v}\""))
                })
            })
            .transpose()?;

        let font_dir = get(ENV_FONT_DIR).map(PathBuf::from);
        if let Some(dir) = font_dir.as_ref()
            && !dir.is_dir()
        {
            return Err(CaptionError::validation(format!(
                "{ENV_FONT_DIR} '{}' is not a directory",
                dir.display()
            )));
        }

        Ok(Self {
            workers,
            font_dir,
            ffmpeg: get(ENV_FFMPEG).map(PathBuf::from),
        })
    }

    /// Apply the set overrides to `options`.
    ///
    /// A custom ffmpeg also selects the `ffprobe` next to it.
    pub fn apply(&self, options: &mut RenderOptions) {
        if let Some(n) = self.workers {
            options.workers = Some(n);
        }
        if let Some(dir) = self.font_dir.as_ref() {
            options.font_dir = Some(dir.clone());
        }
        if let Some(ffmpeg) = self.ffmpeg.as_ref() {
            options.encoder.ffmpeg = Some(ffmpeg.clone());
            let probe = ffmpeg.with_file_name(format!("ffprobe{}", std::env::consts::EXE_SUFFIX));
            if ffmpeg.parent().is_some_and(|p| !p.as_os_str().is_empty()) {
                options.ffprobe = Some(probe);
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/session/config.rs"]
mod tests;
