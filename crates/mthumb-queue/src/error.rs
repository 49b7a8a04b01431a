//! Queue error types.

use mthumb_models::ModelError;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

/// Notification channel failures. These never surface as job failures.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ModelError> for QueueError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Config(msg) => Self::Config(msg),
            other => Self::Config(other.to_string()),
        }
    }
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::PublishFailed(msg.into())
    }
}
