//! Thumbnail job definitions.
//!
//! Jobs are owned by the backend. The worker holds a read-mostly copy for the
//! duration of one attempt and requests every transition through the job store.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Backend-assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend-assigned model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ModelId(pub i64);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one worker process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct WorkerId(pub String);

impl WorkerId {
    /// Generate a new random worker ID.
    pub fn generate() -> Self {
        Self(format!("worker-{}", Uuid::new_v4()))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum JobStatus {
    /// Waiting to be claimed
    #[default]
    Pending,
    /// Claimed by exactly one worker
    InProgress,
    /// Thumbnail uploaded and recorded
    Completed,
    /// Attempt failed; the backend decides whether to retry
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    ///
    /// InProgress -> InProgress is illegal: a claim is exclusive.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }

    /// Validate a transition, returning the new status.
    pub fn transition(&self, next: JobStatus) -> ModelResult<JobStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ModelError::IllegalTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A thumbnail job as returned by a successful claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Job ID
    pub id: JobId,

    /// Model to render
    pub model_id: ModelId,

    /// Content hash of the model file
    pub model_hash: String,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Number of attempts made so far (incremented by the backend)
    #[serde(default)]
    pub attempt_count: u32,

    /// Worker currently holding the claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_worker_id: Option<WorkerId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// When the job was claimed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,

    /// When the job reached Completed or Failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Last failure message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    /// Create a pending job.
    pub fn pending(id: JobId, model_id: ModelId, model_hash: impl Into<String>) -> Self {
        Self {
            id,
            model_id,
            model_hash: model_hash.into(),
            status: JobStatus::Pending,
            attempt_count: 0,
            assigned_worker_id: None,
            created_at: Utc::now(),
            assigned_at: None,
            finished_at: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::InProgress));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!JobStatus::InProgress.can_transition_to(JobStatus::InProgress));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::InProgress));

        let err = JobStatus::Completed.transition(JobStatus::Pending).unwrap_err();
        assert_eq!(err.to_string(), "Illegal job transition: Completed -> Pending");
    }

    #[test]
    fn test_job_deserializes_from_backend_json() {
        let json = r#"{
            "id": 42,
            "modelId": 7,
            "modelHash": "abc123",
            "status": "InProgress",
            "attemptCount": 1,
            "assignedWorkerId": "worker-a",
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;

        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.id, JobId(42));
        assert_eq!(job.model_id, ModelId(7));
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.assigned_worker_id, Some(WorkerId::from_string("worker-a")));
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn test_worker_id_generation() {
        let a = WorkerId::generate();
        let b = WorkerId::generate();
        assert!(a.as_str().starts_with("worker-"));
        assert_ne!(a, b);
    }
}
