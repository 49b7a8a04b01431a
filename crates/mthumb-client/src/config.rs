//! Backend client configuration.

use std::time::Duration;

use mthumb_models::env::{env_parse, env_var};

use crate::error::{ClientError, ClientResult};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Backend REST API configuration.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    /// Optional API key sent as a bearer token
    pub api_key: Option<String>,
    /// Timeout for small JSON requests (claim/complete/fail)
    pub read_timeout: Duration,
    /// Timeout for a whole model download
    pub download_timeout: Duration,
    /// Timeout for one artifact upload
    pub upload_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Largest model file accepted, in bytes
    pub max_model_bytes: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            read_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(120),
            upload_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(5),
            max_model_bytes: 512 * 1024 * 1024,
        }
    }
}

// Keeps the API key out of logs.
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("read_timeout", &self.read_timeout)
            .field("download_timeout", &self.download_timeout)
            .field("upload_timeout", &self.upload_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_model_bytes", &self.max_model_bytes)
            .finish()
    }
}

impl BackendConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let defaults = Self::default();
        let config = Self {
            base_url: env_var("BACKEND_URL")
                .unwrap_or(defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            api_key: env_var("BACKEND_API_KEY"),
            read_timeout: env_secs("BACKEND_READ_TIMEOUT_SECS")?.unwrap_or(defaults.read_timeout),
            download_timeout: env_secs("BACKEND_DOWNLOAD_TIMEOUT_SECS")?
                .unwrap_or(defaults.download_timeout),
            upload_timeout: env_secs("BACKEND_UPLOAD_TIMEOUT_SECS")?
                .unwrap_or(defaults.upload_timeout),
            connect_timeout: env_secs("BACKEND_CONNECT_TIMEOUT_SECS")?
                .unwrap_or(defaults.connect_timeout),
            max_model_bytes: env_parse("BACKEND_MAX_MODEL_BYTES")?
                .unwrap_or(defaults.max_model_bytes),
        };
        config.validate()?;
        Ok(config)
    }

    /// Point at a different base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn validate(&self) -> ClientResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::config(format!(
                "BACKEND_URL must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.max_model_bytes == 0 {
            return Err(ClientError::config("BACKEND_MAX_MODEL_BYTES must be positive"));
        }
        Ok(())
    }
}

fn env_secs(key: &str) -> ClientResult<Option<Duration>> {
    Ok(env_parse(key)?.map(Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.download_timeout, Duration::from_secs(120));
        assert_eq!(config.upload_timeout, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_is_normalised() {
        let config = BackendConfig::default().with_base_url("http://backend:8080/");
        assert_eq!(config.base_url, "http://backend:8080");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = BackendConfig::default().with_base_url("backend:8080");
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_malformed_timeout_is_rejected() {
        std::env::set_var("BACKEND_UPLOAD_TIMEOUT_SECS", "5m");
        let result = BackendConfig::from_env();
        std::env::remove_var("BACKEND_UPLOAD_TIMEOUT_SECS");

        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = BackendConfig::default().with_api_key("s3cret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
