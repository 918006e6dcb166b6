//! Per-(job, stage) persisted rows.

use serde::{Deserialize, Serialize};

/// One element of a job's ordered worker sequence.
///
/// `worker_argument` and `worker_result` are opaque structured blobs owned by
/// the stage's worker type; the core only validates `worker_type` and the
/// presence of a result after completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStage {
    pub worker_type: String,
    pub worker_argument: serde_json::Value,
    pub worker_result: Option<serde_json::Value>,
}

impl JobStage {
    pub fn new(worker_type: impl Into<String>, worker_argument: serde_json::Value) -> Self {
        Self {
            worker_type: worker_type.into(),
            worker_argument,
            worker_result: None,
        }
    }
}

/// Input shape for one stage when creating a job, as accepted by `new_job`
/// and the `POST /newJob` facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJobStage {
    pub worker_type: String,
    #[serde(default = "serde_json::Value::default")]
    pub worker_argument: serde_json::Value,
}
