//! Bounded admission gate for job pipelines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, info, warn};

use crate::metrics::set_in_flight;

/// Why an attempt was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Every slot is taken
    Full,
    /// Shutdown has started
    ShuttingDown,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Full => "pool_full",
            Rejection::ShuttingDown => "shutting_down",
        }
    }
}

/// Counting admission gate with a fixed ceiling.
///
/// Admission never waits: a full pool rejects immediately and the job stays
/// Pending in the backend for a later trigger.
#[derive(Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    shutting_down: AtomicBool,
}

/// One admitted slot. Released on drop.
#[derive(Debug)]
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        // The inner permit is returned after this body runs.
        let active = self
            .capacity
            .saturating_sub(self.semaphore.available_permits() + 1);
        set_in_flight(active);
    }
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Try to reserve a slot without waiting.
    pub fn try_admit(&self) -> Result<PoolPermit, Rejection> {
        if self.is_shutting_down() {
            return Err(Rejection::ShuttingDown);
        }
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => {
                set_in_flight(self.active());
                Ok(PoolPermit {
                    _permit: permit,
                    semaphore: self.semaphore.clone(),
                    capacity: self.capacity,
                })
            }
            Err(TryAcquireError::NoPermits) => Err(Rejection::Full),
            Err(TryAcquireError::Closed) => Err(Rejection::ShuttingDown),
        }
    }

    /// Pipelines currently holding a slot.
    pub fn active(&self) -> usize {
        self.capacity.saturating_sub(self.semaphore.available_permits())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stop admitting. Idempotent.
    pub fn begin_shutdown(&self) {
        if !self.shutting_down.swap(true, Ordering::SeqCst) {
            info!(active = self.active(), "Worker pool stopped admitting jobs");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Wait until every slot is free, or `timeout` elapses.
    ///
    /// Returns `true` when the pool drained in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let Ok(capacity) = u32::try_from(self.capacity) else {
            warn!(capacity = self.capacity, "Pool capacity too large to drain");
            return false;
        };

        debug!(active = self.active(), "Waiting for in-flight jobs");
        match tokio::time::timeout(timeout, self.semaphore.acquire_many(capacity)).await {
            Ok(Ok(_all)) => true,
            Ok(Err(_closed)) => true,
            Err(_) => {
                warn!(
                    active = self.active(),
                    timeout_secs = timeout.as_secs(),
                    "Timeout waiting for in-flight jobs"
                );
                false
            }
        }
    }
}
