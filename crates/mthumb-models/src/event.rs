//! Notification events broadcast by the backend.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{JobId, ModelId};

/// "Job available" wake-up event.
///
/// Delivery is at-least-once and unordered. Receiving one only triggers a
/// claim attempt; it never grants ownership of the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobAvailable {
    pub job_id: JobId,
    pub model_id: ModelId,
    pub model_hash: String,
}

impl JobAvailable {
    pub fn new(job_id: JobId, model_id: ModelId, model_hash: impl Into<String>) -> Self {
        Self {
            job_id,
            model_id,
            model_hash: model_hash.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = JobAvailable::new(JobId(3), ModelId(9), "deadbeef");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"jobId":3,"modelId":9,"modelHash":"deadbeef"}"#);
    }
}
