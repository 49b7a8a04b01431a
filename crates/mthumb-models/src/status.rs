//! Worker status reporting.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::WorkerId;

/// Operator-facing snapshot of one worker process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    pub worker_id: WorkerId,
    pub active_jobs: usize,
    pub max_concurrent_jobs: usize,
    pub shutting_down: bool,
    pub notification_connected: bool,
}
