//! Redis Pub/Sub transport for job-available events.

use async_trait::async_trait;
use futures_util::StreamExt;
use mthumb_models::JobAvailable;
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::config::NotificationConfig;
use crate::error::QueueResult;
use crate::notification::{EventSource, EventStream};

/// Decode a Pub/Sub payload. Malformed payloads are logged and skipped.
pub fn parse_event(payload: &str) -> Option<JobAvailable> {
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed job-available payload");
            None
        }
    }
}

/// Subscribes to the job-available channel.
pub struct RedisEventSource {
    client: redis::Client,
    channel: String,
}

impl RedisEventSource {
    pub fn new(config: &NotificationConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            channel: config.channel.clone(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl EventSource for RedisEventSource {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn connect(&self) -> QueueResult<EventStream> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;
        debug!(channel = %self.channel, "Subscribed to job-available channel");

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            parse_event(&payload)
        });

        Ok(Box::pin(stream))
    }
}

/// Publishes job-available events, as the backend does on enqueue.
pub struct NotificationPublisher {
    client: redis::Client,
    channel: String,
}

impl NotificationPublisher {
    pub fn new(config: &NotificationConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            channel: config.channel.clone(),
        })
    }

    /// Publish one event. Returns the number of subscribers that received it.
    pub async fn publish(&self, event: &JobAvailable) -> QueueResult<usize> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(event)?;

        debug!(channel = %self.channel, job_id = %event.job_id, "Publishing job-available event");
        let receivers: usize = conn.publish(&self.channel, payload).await?;

        Ok(receivers)
    }
}
