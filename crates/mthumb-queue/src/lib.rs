//! Job-available notifications.
//!
//! This crate provides:
//! - The `NotificationChannel` seam the worker listens on
//! - A reconnecting channel with a 0s/2s/10s/30s backoff schedule
//! - Redis Pub/Sub as the broker transport

pub mod backoff;
pub mod config;
pub mod error;
pub mod notification;
pub mod pubsub;

pub use backoff::{ReconnectSchedule, RECONNECT_DELAYS};
pub use config::NotificationConfig;
pub use error::{QueueError, QueueResult};
pub use notification::{
    ConnectionState, EventSource, EventStream, NotificationChannel, ReconnectingChannel,
};
pub use pubsub::{parse_event, NotificationPublisher, RedisEventSource};
