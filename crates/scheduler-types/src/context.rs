//! The read-only denormalized view handed to a worker at claim time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::digest::JobDigest;
use crate::stage::JobStage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContext {
    pub digest: JobDigest,
    pub stages: Vec<JobStage>,
    pub tags: HashMap<String, String>,
}

impl JobContext {
    /// The stage the digest currently points at, if still in range.
    ///
    /// Always `Some` for non-terminal jobs per the contiguity invariant; for
    /// `Finished` jobs this returns the last stage that actually ran.
    pub fn current_stage(&self) -> Option<&JobStage> {
        self.stages.get(self.digest.current_worker as usize)
    }
}
