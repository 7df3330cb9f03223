//! External media engine abstraction and the ffmpeg implementation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use reelcut_common::config::RenderSettings;
use reelcut_common::error::{ReelcutError, ReelcutResult};

/// Stderr lines kept in an execution error.
const STDERR_TAIL_LINES: usize = 8;

/// One trim + filter + encode invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    pub source: PathBuf,
    pub output: PathBuf,

    /// Trim start in source seconds.
    pub start: f64,

    /// Trim length in seconds; `None` runs to the end of the source.
    pub duration: Option<f64>,

    /// Complete `-vf` graph (transform first, then overlays).
    pub filter_graph: String,
}

/// A frame-processing engine able to encode one segment and to join
/// already-encoded segments without re-encoding.
///
/// Implementations block until the invocation finishes.
pub trait MediaEngine: Send + Sync {
    /// Trim, filter, and encode `request.source` into `request.output`.
    fn transcode(&self, request: &TranscodeRequest) -> ReelcutResult<()>;

    /// Stream-copy the files listed in `list_file` into `output`.
    fn concat(&self, list_file: &Path, output: &Path) -> ReelcutResult<()>;

    /// Check if this engine can run on the system.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}

/// Engine backed by the `ffmpeg` command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    settings: RenderSettings,
}

impl FfmpegEngine {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Arguments for one segment encode.
    ///
    /// The trim is applied as input options so seeking is fast; cuts land
    /// on the nearest preceding keyframe.
    pub fn transcode_args(&self, request: &TranscodeRequest) -> Vec<String> {
        let mut args = base_args();

        if request.start > 0.0 || request.duration.is_some() {
            args.push("-ss".into());
            args.push(format_seconds(request.start));
        }
        if let Some(duration) = request.duration {
            args.push("-t".into());
            args.push(format_seconds(duration));
        }

        args.push("-i".into());
        args.push(request.source.display().to_string());
        args.push("-vf".into());
        args.push(request.filter_graph.clone());
        args.extend(self.codec_args());
        args.push(request.output.display().to_string());
        args
    }

    /// Arguments for a stream-copy concatenation.
    pub fn concat_args(&self, list_file: &Path, output: &Path) -> Vec<String> {
        let mut args = base_args();
        args.extend([
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list_file.display().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            output.display().to_string(),
        ]);
        args
    }

    fn codec_args(&self) -> Vec<String> {
        vec![
            "-c:v".into(),
            self.settings.video_codec.clone(),
            "-preset".into(),
            self.settings.preset.clone(),
            "-crf".into(),
            self.settings.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            self.settings.audio_codec.clone(),
            "-movflags".into(),
            "+faststart".into(),
        ]
    }

    fn run(&self, args: &[String]) -> ReelcutResult<()> {
        tracing::debug!(binary = %self.settings.ffmpeg_binary, args = ?args, "Running ffmpeg");
        let started = std::time::Instant::now();

        let output = Command::new(&self.settings.ffmpeg_binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ReelcutError::execution(format!(
                    "Failed to start {}: {e}",
                    self.settings.ffmpeg_binary
                ))
            })?;

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis(),
            status = %output.status,
            "ffmpeg finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelcutError::execution(format!(
                "ffmpeg failed ({}): {}",
                output.status,
                stderr_tail(&stderr)
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

impl MediaEngine for FfmpegEngine {
    fn transcode(&self, request: &TranscodeRequest) -> ReelcutResult<()> {
        self.run(&self.transcode_args(request))
    }

    fn concat(&self, list_file: &Path, output: &Path) -> ReelcutResult<()> {
        self.run(&self.concat_args(list_file, output))
    }

    fn is_available(&self) -> bool {
        Command::new(&self.settings.ffmpeg_binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn base_args() -> Vec<String> {
    ["-y", "-hide_banner", "-loglevel", "error", "-nostats"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn format_seconds(secs: f64) -> String {
    format!("{secs:.3}")
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return "no diagnostic output".to_string();
    }
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join(" | ")
}
