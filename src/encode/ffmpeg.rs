//! Overlay encoding through the system `ffmpeg` binary.
//!
//! Caption frames are piped as raw straight-alpha RGBA into `ffmpeg`, which scales and crops
//! the source video to the canvas and overlays the captions on top. A dedicated writer thread
//! owns the pipe; the bounded queue in front of it is what pushes back on the renderer.

use std::collections::VecDeque;
use std::io::{BufRead as _, BufReader, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::thread::JoinHandle;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::encode::sink::{FrameSink, SinkReady};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{CaptionError, CaptionResult};
use crate::render::frame::FrameRGBA;

/// Frames queued between the coordinator and the writer thread.
pub const DEFAULT_QUEUE_FRAMES: usize = 4;
const STDERR_TAIL_LINES: usize = 24;

/// Output encoder settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoderOptions {
    pub codec: String,
    pub preset: String,
    pub crf: u8,
    /// `ffmpeg` binary; `None` uses the one on `PATH`.
    pub ffmpeg: Option<PathBuf>,
    pub queue_frames: usize,
    pub overwrite: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            codec: "libx264".to_owned(),
            preset: "veryfast".to_owned(),
            crf: 18,
            ffmpeg: None,
            queue_frames: DEFAULT_QUEUE_FRAMES,
            overwrite: true,
        }
    }
}

impl EncoderOptions {
    pub fn ffmpeg_binary(&self) -> PathBuf {
        self.ffmpeg.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }
}

/// Check that `binary -version` runs.
pub fn is_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Command line for overlaying a `canvas`-sized RGBA stream on `source`.
pub fn overlay_args(
    source: &Path,
    output: &Path,
    canvas: Canvas,
    fps: Fps,
    options: &EncoderOptions,
) -> Vec<String> {
    let (w, h) = (canvas.width, canvas.height);
    let filter = format!(
        "[0:v]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}[bg];[bg][1:v]overlay=0:0[outv]"
    );
    let mut args: Vec<String> = vec![if options.overwrite { "-y" } else { "-n" }.to_owned()];
    args.extend(
        [
            "-loglevel".to_owned(),
            "error".to_owned(),
            "-i".to_owned(),
            source.display().to_string(),
            "-f".to_owned(),
            "rawvideo".to_owned(),
            "-pix_fmt".to_owned(),
            "rgba".to_owned(),
            "-s".to_owned(),
            format!("{w}x{h}"),
            "-r".to_owned(),
            format!("{}/{}", fps.num, fps.den),
            "-i".to_owned(),
            "pipe:0".to_owned(),
            "-filter_complex".to_owned(),
            filter,
            "-map".to_owned(),
            "[outv]".to_owned(),
            "-map".to_owned(),
            "0:a?".to_owned(),
            "-c:v".to_owned(),
            options.codec.clone(),
            "-preset".to_owned(),
            options.preset.clone(),
            "-crf".to_owned(),
            options.crf.to_string(),
            "-pix_fmt".to_owned(),
            "yuv420p".to_owned(),
            "-movflags".to_owned(),
            "+faststart".to_owned(),
        ],
    );
    args.push(output.display().to_string());
    args
}

fn ensure_parent_dir(path: &Path) -> CaptionResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

struct Running {
    tx: Option<SyncSender<Vec<u8>>>,
    writer: Option<JoinHandle<std::io::Result<u64>>>,
    stderr: Option<JoinHandle<Vec<String>>>,
    child: Child,
}

impl Running {
    fn stderr_tail(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|h| h.join().ok())
            .map(|lines| lines.join("\n"))
            .unwrap_or_default()
    }
}

/// [`FrameSink`] that overlays captions on a source video with `ffmpeg`.
pub struct FfmpegOverlaySink {
    source: PathBuf,
    output: PathBuf,
    options: EncoderOptions,
    canvas: Option<Canvas>,
    running: Option<Running>,
    parked: Option<(u64, Vec<u8>)>,
    /// Set once ffmpeg owns `output`; cleared by a successful `end`.
    partial: bool,
}

impl FfmpegOverlaySink {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>, options: EncoderOptions) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            options,
            canvas: None,
            running: None,
            parked: None,
            partial: false,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn running(&mut self, stage: &'static str, frame: Option<u64>) -> CaptionResult<&mut Running> {
        self.running
            .as_mut()
            .ok_or_else(|| CaptionError::sink(stage, frame, "ffmpeg is not running"))
    }

    /// Remove the output of a stream that did not finish.
    fn discard_partial_output(&mut self) {
        if !std::mem::take(&mut self.partial) {
            return;
        }
        match std::fs::remove_file(&self.output) {
            Ok(()) => tracing::debug!(output = %self.output.display(), "removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(output = %self.output.display(), error = %e, "failed to remove partial output")
            }
        }
    }

    /// Turn a dead writer into an error carrying ffmpeg's last words.
    fn writer_failed(&mut self, stage: &'static str, frame: u64) -> CaptionError {
        let Some(mut run) = self.running.take() else {
            return CaptionError::sink(stage, Some(frame), "ffmpeg is not running");
        };
        drop(run.tx.take());
        let io = run
            .writer
            .take()
            .and_then(|h| h.join().ok())
            .and_then(Result::err)
            .map(|e| e.to_string())
            .unwrap_or_else(|| "writer stopped".to_owned());
        let _ = run.child.kill();
        let _ = run.child.wait();
        let tail = run.stderr_tail();
        CaptionError::sink(stage, Some(frame), format!("{io}; ffmpeg: {tail}"))
    }
}

fn spawn_writer(
    rx: Receiver<Vec<u8>>,
    mut stdin: std::process::ChildStdin,
) -> std::io::Result<JoinHandle<std::io::Result<u64>>> {
    std::thread::Builder::new()
        .name("captionflow-ffmpeg-writer".to_owned())
        .spawn(move || {
            let mut written = 0u64;
            for buf in rx {
                stdin.write_all(&buf)?;
                written += 1;
            }
            stdin.flush()?;
            Ok(written)
        })
}

fn spawn_stderr_drain(
    stderr: std::process::ChildStderr,
) -> std::io::Result<JoinHandle<Vec<String>>> {
    std::thread::Builder::new()
        .name("captionflow-ffmpeg-stderr".to_owned())
        .spawn(move || {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail.into_iter().collect()
        })
}

impl FrameSink for FfmpegOverlaySink {
    #[tracing::instrument(skip_all, fields(output = %self.output.display(), total_frames = total_frames))]
    fn begin(&mut self, canvas: Canvas, fps: Fps, total_frames: u64) -> CaptionResult<()> {
        if self.running.is_some() {
            return Err(CaptionError::sink("begin", None, "sink already started"));
        }
        if !canvas.width.is_multiple_of(2) || !canvas.height.is_multiple_of(2) {
            return Err(CaptionError::validation(
                "encode width/height must be even (required for yuv420p output)",
            ));
        }
        if !self.options.overwrite && self.output.exists() {
            return Err(CaptionError::validation(format!(
                "output file '{}' already exists",
                self.output.display()
            )));
        }
        ensure_parent_dir(&self.output)?;

        let binary = self.options.ffmpeg_binary();
        let args = overlay_args(&self.source, &self.output, canvas, fps, &self.options);
        tracing::debug!(binary = %binary.display(), ?args, "spawning ffmpeg");
        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CaptionError::sink(
                    "begin",
                    None,
                    format!("failed to spawn '{}' (is it installed?): {e}", binary.display()),
                )
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CaptionError::sink("begin", None, "failed to open ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CaptionError::sink("begin", None, "failed to open ffmpeg stderr"))?;

        let (tx, rx) = sync_channel(self.options.queue_frames.max(1));
        let spawned = spawn_writer(rx, stdin).and_then(|w| spawn_stderr_drain(stderr).map(|s| (w, s)));
        let (writer, stderr) = match spawned {
            Ok(handles) => handles,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CaptionError::sink("begin", None, format!("failed to spawn thread: {e}")));
            }
        };

        tracing::info!(
            width = canvas.width,
            height = canvas.height,
            fps = fps.as_f64(),
            total_frames,
            "ffmpeg overlay started"
        );
        self.canvas = Some(canvas);
        self.partial = true;
        self.running = Some(Running {
            tx: Some(tx),
            writer: Some(writer),
            stderr: Some(stderr),
            child,
        });
        Ok(())
    }

    fn push_frame(&mut self, index: FrameIndex, frame: FrameRGBA) -> CaptionResult<SinkReady> {
        if self.parked.is_some() {
            return Err(CaptionError::sink(
                "push_frame",
                Some(index.0),
                "push while busy; wait_ready was not called",
            ));
        }
        if self.canvas != Some(frame.canvas()) {
            return Err(CaptionError::sink(
                "push_frame",
                Some(index.0),
                format!("frame size {}x{} does not match the stream", frame.width, frame.height),
            ));
        }
        let bytes = frame.to_straight_rgba8();
        let tx = self
            .running("push_frame", Some(index.0))?
            .tx
            .as_ref()
            .ok_or_else(|| CaptionError::sink("push_frame", Some(index.0), "stream closed"))?;
        match tx.try_send(bytes) {
            Ok(()) => Ok(SinkReady::Ready),
            Err(TrySendError::Full(bytes)) => {
                self.parked = Some((index.0, bytes));
                Ok(SinkReady::Busy)
            }
            Err(TrySendError::Disconnected(_)) => Err(self.writer_failed("push_frame", index.0)),
        }
    }

    fn wait_ready(&mut self) -> CaptionResult<()> {
        let Some((index, bytes)) = self.parked.take() else {
            return Ok(());
        };
        let tx = self
            .running("wait_ready", Some(index))?
            .tx
            .as_ref()
            .ok_or_else(|| CaptionError::sink("wait_ready", Some(index), "stream closed"))?;
        if tx.send(bytes).is_err() {
            return Err(self.writer_failed("wait_ready", index));
        }
        Ok(())
    }

    fn end(&mut self) -> CaptionResult<()> {
        self.wait_ready()?;
        let mut run = self
            .running
            .take()
            .ok_or_else(|| CaptionError::sink("end", None, "ffmpeg is not running"))?;
        drop(run.tx.take());

        let written = match run.writer.take().map(JoinHandle::join) {
            Some(Ok(Ok(n))) => n,
            Some(Ok(Err(e))) => {
                let _ = run.child.wait();
                let tail = run.stderr_tail();
                return Err(CaptionError::sink("end", None, format!("{e}; ffmpeg: {tail}")));
            }
            Some(Err(_)) => {
                let _ = run.child.kill();
                let _ = run.child.wait();
                return Err(CaptionError::sink("end", None, "writer thread panicked"));
            }
            None => 0,
        };
        let status = run
            .child
            .wait()
            .map_err(|e| CaptionError::sink("end", None, format!("failed to wait for ffmpeg: {e}")))?;
        let tail = run.stderr_tail();
        if !status.success() {
            return Err(CaptionError::sink(
                "end",
                None,
                format!("ffmpeg exited with {status}: {}", tail.trim()),
            ));
        }
        self.partial = false;
        tracing::info!(frames = written, output = %self.output.display(), "ffmpeg overlay finished");
        Ok(())
    }

    fn abort(&mut self) {
        self.parked = None;
        if let Some(mut run) = self.running.take() {
            drop(run.tx.take());
            let _ = run.child.kill();
            let _ = run.child.wait();
            if let Some(w) = run.writer.take() {
                let _ = w.join();
            }
            let _ = run.stderr_tail();
            tracing::warn!(output = %self.output.display(), "ffmpeg overlay aborted");
        }
        self.discard_partial_output();
    }
}

impl Drop for FfmpegOverlaySink {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
