//! Job-available notifications with automatic reconnection.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use mthumb_models::JobAvailable;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backoff::ReconnectSchedule;
use crate::error::{QueueError, QueueResult};

/// Stream of decoded events from one live connection. Ends on disconnect.
pub type EventStream = Pin<Box<dyn Stream<Item = JobAvailable> + Send>>;

/// A broker connection that yields job-available events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Open one connection and subscribe.
    async fn connect(&self) -> QueueResult<EventStream>;
}

/// Long-lived wake-up channel.
///
/// `run` forwards every received event into `sink` until `shutdown` flips to
/// true. Delivery is at-least-once and unordered; an event is only a hint to
/// attempt a claim.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn run(&self, sink: mpsc::Sender<JobAvailable>, shutdown: watch::Receiver<bool>);

    fn is_connected(&self) -> bool;
}

/// Shared connected/disconnected flag.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState(Arc<AtomicBool>);

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns the previous value.
    pub fn set(&self, connected: bool) -> bool {
        self.0.swap(connected, Ordering::SeqCst)
    }
}

enum PumpEnd {
    StreamEnded,
    SinkClosed,
    Shutdown,
}

/// `NotificationChannel` that reconnects to an `EventSource` on a
/// 0s/2s/10s/30s schedule, forever.
pub struct ReconnectingChannel<S> {
    source: S,
    state: ConnectionState,
    connect_timeout: Duration,
}

impl<S: EventSource> ReconnectingChannel<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: ConnectionState::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Handle to the connection flag.
    pub fn state(&self) -> ConnectionState {
        self.state.clone()
    }

    async fn connect(&self) -> QueueResult<EventStream> {
        tokio::time::timeout(self.connect_timeout, self.source.connect())
            .await
            .map_err(|_| {
                QueueError::connection_failed(format!(
                    "connect timed out after {:?}",
                    self.connect_timeout
                ))
            })?
    }

    async fn pump(
        &self,
        mut stream: EventStream,
        sink: &mpsc::Sender<JobAvailable>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PumpEnd {
        loop {
            tokio::select! {
                next = stream.next() => match next {
                    Some(event) => {
                        debug!(
                            job_id = %event.job_id,
                            model_id = %event.model_id,
                            "Received job-available notification"
                        );
                        match sink.try_send(event) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(event)) => {
                                // Job stays Pending; a later notification or poll surfaces it.
                                debug!(job_id = %event.job_id, "Notification buffer full, dropping event");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => return PumpEnd::SinkClosed,
                        }
                    }
                    None => return PumpEnd::StreamEnded,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return PumpEnd::Shutdown;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<S: EventSource> NotificationChannel for ReconnectingChannel<S> {
    async fn run(&self, sink: mpsc::Sender<JobAvailable>, mut shutdown: watch::Receiver<bool>) {
        let mut schedule = ReconnectSchedule::new();
        let mut delay: Option<Duration> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Some(delay) = delay {
                info!(
                    source = self.source.name(),
                    attempt = schedule.attempt(),
                    delay_secs = delay.as_secs(),
                    "Reconnecting to notification channel"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }
            }

            debug!(source = self.source.name(), "Connecting to notification channel");
            let connected = tokio::select! {
                result = self.connect() => Some(result),
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    None
                }
            };
            let Some(connected) = connected else {
                continue;
            };

            match connected {
                Ok(stream) => {
                    self.state.set(true);
                    schedule.reset();
                    info!(source = self.source.name(), "Notification channel connected");

                    let end = self.pump(stream, &sink, &mut shutdown).await;
                    self.state.set(false);

                    match end {
                        PumpEnd::StreamEnded => {
                            warn!(
                                source = self.source.name(),
                                "Notification channel disconnected, falling back to polling"
                            );
                        }
                        PumpEnd::SinkClosed | PumpEnd::Shutdown => break,
                    }
                }
                Err(e) => {
                    warn!(
                        source = self.source.name(),
                        error = %e,
                        "Notification channel connection failed, polling continues"
                    );
                }
            }

            delay = Some(schedule.next_delay());
        }

        self.state.set(false);
        info!(source = self.source.name(), "Notification channel stopped");
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }
}
