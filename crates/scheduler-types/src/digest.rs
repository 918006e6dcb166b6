//! The job digest: the small, hot row used for all scheduling decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job_id::JobId;
use crate::status::Status;

/// Everything needed to make a scheduling decision without fetching stage bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDigest {
    pub job_id: JobId,
    pub created_time: DateTime<Utc>,
    pub modified_time: DateTime<Utc>,
    pub status: Status,
    /// Claimant hostname while `status == InProgress`; empty otherwise.
    pub current_worker_hostname: String,
    /// Zero-based stage index the job is currently at (or was last at, for
    /// terminal jobs).
    pub current_worker: u32,
}

impl JobDigest {
    pub fn is_claimed(&self) -> bool {
        !self.current_worker_hostname.is_empty()
    }
}
