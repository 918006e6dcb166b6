//! Wire shapes for the three scheduler RPCs and the two log-intake publishes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::exception::Deliverable;
use crate::job_id::JobId;
use crate::stage::NewJobStage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJobRequest {
    pub job_workers: Vec<NewJobStage>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusJobRequest {
    pub job_id: JobId,
    pub hostname: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusOutcome {
    Focused,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusJobResponse {
    pub outcome: FocusOutcome,
    pub context: crate::context::JobContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateJobRequest {
    pub hostname: String,
    pub worker_type: String,
    pub stage_index: u32,
    pub job_id: JobId,
    pub deliverable: Deliverable,
}

/// `Some` when the stage completed cleanly and another stage follows; the
/// scheduler server publishes the job id onto `next_worker_type`'s queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateJobResponse {
    pub dispatch: Option<DispatchNext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchNext {
    pub job_id: JobId,
    pub next_worker_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortJobRequest {
    pub job_id: JobId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldJobRequest {
    pub job_id: JobId,
}

/// Returned by `get_system_config`: storage configuration plus the
/// per-worker-type config blob for the calling worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfigRequest {
    pub worker_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfigResponse {
    pub storage: serde_json::Value,
    pub worker_config: serde_json::Value,
}
