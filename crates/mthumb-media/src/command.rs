//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Input argument for reading from the child's stdin.
pub const STDIN_INPUT: &str = "pipe:0";

/// FFmpeg verbosity; stderr is only kept for failure diagnostics.
const LOG_LEVEL: &str = "error";

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path (or `pipe:0`)
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Command that reads raw frames from stdin.
    pub fn from_stdin(output: impl AsRef<Path>) -> Self {
        Self::new(STDIN_INPUT, output)
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Declare the input as raw straight-alpha RGBA frames.
    pub fn raw_rgba_input(self, width: u32, height: u32, fps: u32) -> Self {
        self.input_arg("-f")
            .input_arg("rawvideo")
            .input_arg("-pix_fmt")
            .input_arg("rgba")
            .input_arg("-s")
            .input_arg(format!("{}x{}", width, height))
            .input_arg("-r")
            .input_arg(fps.to_string())
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set codec quality (`-quality`).
    pub fn quality(self, quality: u8) -> Self {
        self.output_arg("-quality").output_arg(quality.to_string())
    }

    /// Set loop count; 0 loops forever.
    pub fn loop_count(self, count: u32) -> Self {
        self.output_arg("-loop").output_arg(count.to_string())
    }

    /// Drop any audio stream.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(LOG_LEVEL.to_string());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands fed through stdin.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run `cmd`, writing `chunks` to its stdin in order, then closing it.
    ///
    /// Stderr is captured and attached to the error on a non-zero exit. The
    /// child is killed if the runner times out.
    pub async fn run_with_input(&self, cmd: &FfmpegCommand, chunks: &[&[u8]]) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("failed to open ffmpeg stdin"))?;

        let write = async move {
            for chunk in chunks {
                stdin.write_all(chunk).await?;
            }
            stdin.shutdown().await?;
            Ok::<_, std::io::Error>(())
        };

        let run = async { tokio::join!(write, child.wait_with_output()) };

        let (write_result, output) = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("FFmpeg timed out after {} seconds, killing process", secs);
                    return Err(MediaError::Timeout(secs));
                }
            },
            None => run.await,
        };

        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MediaError::ffmpeg_failed(
                format!("FFmpeg exited with status {}", output.status),
                (!stderr.is_empty()).then_some(stderr),
                output.status.code(),
            ));
        }

        // A clean exit after a failed write means ffmpeg stopped reading early.
        write_result.map_err(|e| {
            MediaError::ffmpeg_failed(format!("failed to write frames to ffmpeg: {e}"), None, None)
        })?;

        Ok(())
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check whether the local FFmpeg build ships `encoder`.
pub async fn has_encoder(encoder: &str) -> MediaResult<bool> {
    check_ffmpeg()?;
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await?;

    let listing = String::from_utf8_lossy(&output.stdout);
    Ok(listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(encoder)))
}
