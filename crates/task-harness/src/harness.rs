//! Drives one task execution: allocates the scratch directory, runs the
//! handler, then tears the directory down unconditionally.

use std::path::PathBuf;
use std::sync::Arc;

use message_bus::BusConnection;
use object_storage::ObjectStorage;
use scheduler_types::{JobId, TaskOutcome};
use tempfile::TempDir;

use crate::context::TaskContext;
use crate::error::HarnessError;
use crate::handler::TaskHandler;

pub struct Harness {
    bus: BusConnection,
    storage: Arc<dyn ObjectStorage>,
    scratch_root: Option<PathBuf>,
}

impl Harness {
    pub fn new(bus: BusConnection, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            bus,
            storage,
            scratch_root: None,
        }
    }

    /// Allocate scratch directories under `root` instead of the system temp
    /// directory. Useful when the worker's filesystem layout needs scratch
    /// space to live alongside other per-host state.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub async fn run(
        &self,
        job_id: JobId,
        stage_index: u32,
        worker_type: &str,
        hostname: &str,
        argument: serde_json::Value,
        worker_config: serde_json::Value,
        handler: &dyn TaskHandler,
    ) -> Result<TaskOutcome, HarnessError> {
        let prefix = format!("job-{job_id}-");
        let scratch_dir = match &self.scratch_root {
            Some(root) => tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?,
            None => tempfile::Builder::new().prefix(&prefix).tempdir()?,
        };

        let ctx = TaskContext {
            job_id,
            stage_index,
            worker_type: worker_type.to_string(),
            hostname: hostname.to_string(),
            argument,
            worker_config,
            scratch_dir,
            bus: self.bus.clone(),
            storage: self.storage.clone(),
        };

        let outcome = handler.on_task(&ctx).await;
        handler.on_clean(&ctx).await;
        // `ctx` (and its `TempDir`) drops here, removing the scratch
        // directory on every path: normal return, or the caller cancelling
        // this future out from under us.
        Ok(outcome)
    }
}
