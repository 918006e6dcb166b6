//! Job tags: a searchable `(job_id, key) -> value` map.

use serde::{Deserialize, Serialize};

use crate::job_id::JobId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTag {
    pub job_id: JobId,
    pub key: String,
    pub value: String,
}
