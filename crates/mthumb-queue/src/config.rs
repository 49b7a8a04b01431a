//! Notification channel configuration.

use mthumb_models::env::{env_parse, env_var};

use crate::error::{QueueError, QueueResult};

/// Default Pub/Sub channel carrying job-available events.
pub const DEFAULT_CHANNEL: &str = "mthumb:jobs:available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Pub/Sub channel name
    pub channel: String,
    /// Capacity of the in-process event buffer
    pub buffer: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            buffer: 64,
        }
    }
}

impl NotificationConfig {
    /// Create config from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        let defaults = Self::default();
        let buffer = env_parse::<usize>("NOTIFY_BUFFER")?.unwrap_or(defaults.buffer);
        if buffer == 0 {
            return Err(QueueError::Config("NOTIFY_BUFFER must be at least 1".to_string()));
        }
        Ok(Self {
            redis_url: env_var("REDIS_URL").unwrap_or(defaults.redis_url),
            channel: env_var("NOTIFY_CHANNEL").unwrap_or(defaults.channel),
            buffer,
        })
    }
}
