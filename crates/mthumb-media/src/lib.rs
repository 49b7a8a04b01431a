//! Thumbnail encoding.
//!
//! This crate provides:
//! - An `Encoder` seam turning an ordered frame sequence into an animated
//!   preview plus a poster image
//! - An FFmpeg command builder and a runner that feeds raw frames via stdin
//! - JPEG poster writing

pub mod command;
pub mod encoder;
pub mod error;
pub mod poster;

pub use command::{check_ffmpeg, has_encoder, FfmpegCommand, FfmpegRunner};
pub use encoder::{validate_sequence, Encoder, FfmpegEncoder, ANIMATED_CODEC};
pub use error::{MediaError, MediaResult};
pub use poster::write_poster;
