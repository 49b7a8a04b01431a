//! Render error types.

use std::path::PathBuf;

use mthumb_models::{ModelError, ModelFormat};
use thiserror::Error;

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while loading or rendering a scene.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid orbit configuration: {0}")]
    Config(#[from] ModelError),

    #[error("No loader available for {0} models")]
    UnsupportedFormat(ModelFormat),

    #[error("Failed to parse {} at line {line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Scene contains no renderable geometry")]
    EmptyScene,

    #[error("Frame {index} failed: {message}")]
    FrameFailed { index: u32, message: String },

    #[error("Render cancelled before frame {index}")]
    Cancelled { index: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn frame_failed(index: u32, message: impl Into<String>) -> Self {
        Self::FrameFailed {
            index,
            message: message.into(),
        }
    }

    /// Whether this error stems from configuration rather than the model.
    pub fn is_config(&self) -> bool {
        matches!(self, RenderError::Config(_))
    }
}
