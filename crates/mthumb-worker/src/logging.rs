//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for job attempts with
//! tracing spans and contextual information.

use mthumb_models::{Job, JobId, ModelId};
use tracing::{error, info, warn, Span};

/// Job logger for structured logging with consistent formatting.
///
/// Every line carries the job id, model id and operation so one attempt can
/// be followed across interleaved pipelines.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    model_id: ModelId,
    operation: String,
}

impl JobLogger {
    /// Create a new job logger for a specific job and operation.
    pub fn new(job: &Job, operation: &str) -> Self {
        Self {
            job_id: job.id,
            model_id: job.model_id,
            operation: operation.to_string(),
        }
    }

    /// Log the start of a job attempt.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            model_id = %self.model_id,
            operation = %self.operation,
            "Job started: {}", message
        );
    }

    /// Log a stage transition.
    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            model_id = %self.model_id,
            operation = %self.operation,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            model_id = %self.model_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            model_id = %self.model_id,
            operation = %self.operation,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            model_id = %self.model_id,
            operation = %self.operation,
            "Job completed: {}", message
        );
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            model_id = %self.model_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job = Job::pending(JobId(7), ModelId(70), "hash");
        let logger = JobLogger::new(&job, "thumbnail");

        assert_eq!(logger.job_id, JobId(7));
        assert_eq!(logger.model_id, ModelId(70));
        assert_eq!(logger.operation, "thumbnail");
    }
}
