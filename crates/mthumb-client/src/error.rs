//! Backend client error types.

use mthumb_models::ModelError;
use thiserror::Error;

/// Result type for backend operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Refusing to upload empty artifact: {0}")]
    EmptyUpload(String),

    #[error("Download exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ModelError> for ClientError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Config(msg) => Self::Config(msg),
            other => Self::Config(other.to_string()),
        }
    }
}

impl ClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Classify a non-success HTTP status.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            429 => Self::RateLimited(message),
            500..=599 => Self::ServerError(status, message),
            _ => Self::RequestFailed(format!("HTTP {}: {}", status, message)),
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized(_) => Some(401),
            ClientError::NotFound(_) => Some(404),
            ClientError::Conflict(_) => Some(409),
            ClientError::RateLimited(_) => Some(429),
            ClientError::ServerError(status, _) => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the failure is transient. Informational only; callers never retry jobs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Network(_) | ClientError::RateLimited(_) | ClientError::ServerError(..)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(ClientError::from_http_status(401, "x"), ClientError::Unauthorized(_)));
        assert!(matches!(ClientError::from_http_status(404, "x"), ClientError::NotFound(_)));
        assert!(matches!(ClientError::from_http_status(409, "x"), ClientError::Conflict(_)));
        assert!(matches!(ClientError::from_http_status(400, "x"), ClientError::RequestFailed(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(ClientError::from_http_status(503, "unavailable").is_retryable());
        assert!(ClientError::from_http_status(429, "slow down").is_retryable());
        assert!(!ClientError::from_http_status(400, "bad").is_retryable());
        assert!(!ClientError::EmptyUpload("poster.jpg".into()).is_retryable());
    }

    #[test]
    fn test_http_status_getter() {
        assert_eq!(ClientError::from_http_status(502, "bad gateway").http_status(), Some(502));
        assert_eq!(ClientError::invalid_response("x").http_status(), None);
    }
}
