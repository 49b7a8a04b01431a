//! Job-attempt triggers.

use std::fmt;

use mthumb_models::JobAvailable;

/// What prompted an attempt to claim a job.
///
/// Both producers feed the same admission and claim path; a trigger never
/// names the job that will be claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTrigger {
    /// A job-available event from the notification channel
    Notification(JobAvailable),
    /// A tick of the polling fallback
    Poll,
}

impl JobTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobTrigger::Notification(_) => "notification",
            JobTrigger::Poll => "poll",
        }
    }
}

impl fmt::Display for JobTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobTrigger::Notification(event) => write!(f, "notification(job {})", event.job_id),
            JobTrigger::Poll => f.write_str("poll"),
        }
    }
}
