//! Prometheus metrics for the worker.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{Stage, WorkerError, WorkerResult};

/// Install the Prometheus recorder.
/// Returns a handle that renders the exposition text.
pub fn init_metrics() -> WorkerResult<PrometheusHandle> {
    PrometheusBuilder::new().install_recorder().map_err(|e| {
        WorkerError::config_error(format!("Failed to install Prometheus recorder: {}", e))
    })
}

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_CLAIMED_TOTAL: &str = "mthumb_jobs_claimed_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "mthumb_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "mthumb_jobs_failed_total";
    pub const CLAIMS_LOST_TOTAL: &str = "mthumb_claims_lost_total";
    pub const ADMISSIONS_REJECTED_TOTAL: &str = "mthumb_admissions_rejected_total";
    pub const NOTIFICATIONS_RECEIVED_TOTAL: &str = "mthumb_notifications_received_total";
    pub const JOBS_IN_FLIGHT: &str = "mthumb_jobs_in_flight";
    pub const STAGE_DURATION_SECONDS: &str = "mthumb_stage_duration_seconds";
}

/// Record an attempt trigger.
pub fn record_trigger(trigger: &str) {
    counter!(names::NOTIFICATIONS_RECEIVED_TOTAL, "trigger" => trigger.to_string()).increment(1);
}

pub fn record_admission_rejected() {
    counter!(names::ADMISSIONS_REJECTED_TOTAL).increment(1);
}

pub fn record_claimed() {
    counter!(names::JOBS_CLAIMED_TOTAL).increment(1);
}

pub fn record_claim_lost() {
    counter!(names::CLAIMS_LOST_TOTAL).increment(1);
}

pub fn record_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

pub fn record_failed(stage: Stage) {
    counter!(names::JOBS_FAILED_TOTAL, "stage" => stage.as_str()).increment(1);
}

pub fn record_stage_duration(stage: Stage, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.as_str()).record(duration_secs);
}

pub fn set_in_flight(count: usize) {
    gauge!(names::JOBS_IN_FLIGHT).set(count as f64);
}
