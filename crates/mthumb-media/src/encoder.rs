//! Frame sequence encoder.

use std::path::Path;

use async_trait::async_trait;
use mthumb_models::{ArtifactKind, EncodedArtifact, EncodingConfig, EncodingResult, Frame};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::poster::write_poster;

/// Animated output codec.
pub const ANIMATED_CODEC: &str = "libwebp_anim";

/// Background used when flattening the poster's alpha channel.
const POSTER_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Turns an ordered frame sequence into an animated preview and a poster.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Encode `frames` into `out_dir`.
    ///
    /// Frames are emitted in slice order; the poster is always `frames[0]`.
    /// An empty sequence is rejected before any codec runs.
    async fn encode(
        &self,
        frames: &[Frame],
        config: &EncodingConfig,
        out_dir: &Path,
    ) -> MediaResult<EncodingResult>;
}

/// Dimensions shared by every frame, after checking the sequence is encodable.
pub fn validate_sequence(frames: &[Frame]) -> MediaResult<(u32, u32)> {
    let first = frames.first().ok_or(MediaError::EmptySequence)?;
    let (width, height) = (first.width, first.height);

    for (k, frame) in frames.iter().enumerate() {
        if frame.index as usize != k {
            return Err(MediaError::invalid_sequence(format!(
                "frame at position {} carries ordinal {}",
                k, frame.index
            )));
        }
        if frame.width != width || frame.height != height {
            return Err(MediaError::invalid_sequence(format!(
                "frame {} is {}x{}, expected {}x{}",
                k, frame.width, frame.height, width, height
            )));
        }
        if !frame.is_well_formed() {
            return Err(MediaError::invalid_sequence(format!(
                "frame {} buffer is {} bytes, expected {}",
                k,
                frame.data.len(),
                frame.expected_len()
            )));
        }
    }

    Ok((width, height))
}

/// Encoder backed by the FFmpeg CLI (animated WebP) and the `image` crate (JPEG poster).
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each codec invocation.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }

    /// Build the animated-output command.
    pub fn animated_command(
        width: u32,
        height: u32,
        config: &EncodingConfig,
        output: &Path,
    ) -> FfmpegCommand {
        FfmpegCommand::from_stdin(output)
            .raw_rgba_input(width, height, config.framerate)
            .no_audio()
            .video_codec(ANIMATED_CODEC)
            .quality(config.animated_quality)
            .loop_count(if config.loop_forever { 0 } else { 1 })
    }

    /// Write the poster for `frames` into `out_dir`. The poster is always
    /// the first frame of the sequence.
    pub async fn encode_poster(
        &self,
        frames: &[Frame],
        config: &EncodingConfig,
        out_dir: &Path,
    ) -> MediaResult<EncodedArtifact> {
        let frame = frames.first().ok_or(MediaError::EmptySequence)?.clone();
        let quality = config.poster_quality;
        let (width, height) = (frame.width, frame.height);
        let path = out_dir.join(ArtifactKind::Poster.file_name());

        let task_path = path.clone();
        let size_bytes = tokio::task::spawn_blocking(move || {
            write_poster(&frame, &task_path, quality, POSTER_BACKGROUND)
        })
        .await
        .map_err(|e| MediaError::internal(format!("poster task panicked: {e}")))??;

        Ok(EncodedArtifact {
            kind: ArtifactKind::Poster,
            path,
            size_bytes,
            width,
            height,
        })
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        frames: &[Frame],
        config: &EncodingConfig,
        out_dir: &Path,
    ) -> MediaResult<EncodingResult> {
        let (width, height) = validate_sequence(frames)?;
        config.validate()?;
        tokio::fs::create_dir_all(out_dir).await?;

        let animated_path = out_dir.join(ArtifactKind::Animated.file_name());
        let cmd = Self::animated_command(width, height, config, &animated_path);
        let chunks: Vec<&[u8]> = frames.iter().map(|f| f.data.as_slice()).collect();

        debug!(frames = frames.len(), width, height, "Encoding animated preview");
        self.runner.run_with_input(&cmd, &chunks).await?;

        let animated_size = tokio::fs::metadata(&animated_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        if animated_size == 0 {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg produced no animated output",
                None,
                None,
            ));
        }

        let poster = self.encode_poster(frames, config, out_dir).await?;

        info!(
            frames = frames.len(),
            animated_bytes = animated_size,
            poster_bytes = poster.size_bytes,
            "Encoded thumbnail"
        );

        Ok(EncodingResult {
            animated: EncodedArtifact {
                kind: ArtifactKind::Animated,
                path: animated_path,
                size_bytes: animated_size,
                width,
                height,
            },
            poster,
            frame_count: frames.len(),
        })
    }
}
