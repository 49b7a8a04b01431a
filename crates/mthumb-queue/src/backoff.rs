//! Reconnect delay schedule.

use std::time::Duration;

/// Delays before successive reconnect attempts; the last one repeats forever.
pub const RECONNECT_DELAYS: [Duration; 4] = [
    Duration::from_secs(0),
    Duration::from_secs(2),
    Duration::from_secs(10),
    Duration::from_secs(30),
];

/// Yields 0s, 2s, 10s, then 30s indefinitely. Reset after a successful connect.
#[derive(Debug, Clone, Default)]
pub struct ReconnectSchedule {
    attempt: usize,
}

impl ReconnectSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let idx = self.attempt.min(RECONNECT_DELAYS.len() - 1);
        self.attempt = self.attempt.saturating_add(1);
        RECONNECT_DELAYS[idx]
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
