//! Worker error types.

use std::fmt;

use mthumb_client::ClientError;
use mthumb_media::MediaError;
use mthumb_models::ModelError;
use mthumb_queue::QueueError;
use mthumb_render::RenderError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Pipeline stage an attempt was in when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Workspace preparation, before the fetch
    Setup,
    Fetch,
    Render,
    Encode,
    Upload,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Fetch => "fetch",
            Stage::Render => "render",
            Stage::Encode => "encode",
            Stage::Upload => "upload",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workspace setup failed: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Fetch failed: {0}")]
    Fetch(#[source] ClientError),

    #[error("Render failed: {0}")]
    Render(#[source] RenderError),

    #[error("Encoding failed: {0}")]
    Encoding(#[source] MediaError),

    #[error("Upload failed: {0}")]
    Upload(#[source] ClientError),

    #[error("Complete failed after upload: {0}")]
    Complete(#[source] ClientError),

    #[error("{stage} stage timed out after {secs}s")]
    Timeout { stage: Stage, secs: u64 },

    #[error("{stage} stage aborted: {message}")]
    Aborted { stage: Stage, message: String },

    #[error("Notification channel error: {0}")]
    Connection(#[from] QueueError),

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),
}

impl From<ModelError> for WorkerError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Config(msg) => Self::Config(msg),
            other => Self::Config(other.to_string()),
        }
    }
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn aborted(stage: Stage, msg: impl Into<String>) -> Self {
        Self::Aborted {
            stage,
            message: msg.into(),
        }
    }

    /// Stage this error belongs to, if it is a per-job error.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WorkerError::Workspace(_) => Some(Stage::Setup),
            WorkerError::Fetch(_) => Some(Stage::Fetch),
            WorkerError::Render(_) => Some(Stage::Render),
            WorkerError::Encoding(_) => Some(Stage::Encode),
            WorkerError::Upload(_) => Some(Stage::Upload),
            WorkerError::Complete(_) => Some(Stage::Complete),
            WorkerError::Timeout { stage, .. } | WorkerError::Aborted { stage, .. } => {
                Some(*stage)
            }
            WorkerError::Config(_) | WorkerError::Connection(_) | WorkerError::Server(_) => None,
        }
    }

    /// Human-readable message sent with `FailJob`.
    ///
    /// Codec diagnostics are appended so the backend keeps the tool's output.
    pub fn failure_message(&self) -> String {
        match self {
            WorkerError::Encoding(e) => match e.diagnostics() {
                Some(stderr) if !stderr.trim().is_empty() => {
                    format!("{}\n{}", self, stderr.trim())
                }
                _ => self.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Whether the upload already happened, leaving storage for the backend
    /// to reconcile.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, WorkerError::Complete(_))
    }
}
