//! Append-only job and system log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job_id::JobId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub time_stamp: DateTime<Utc>,
    pub job_id: JobId,
    pub worker_type: String,
    pub worker_hostname: String,
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemLogEntry {
    pub time_stamp: DateTime<Utc>,
    pub job_id: Option<JobId>,
    pub worker_type: String,
    pub worker_hostname: String,
    pub content: serde_json::Value,
}
