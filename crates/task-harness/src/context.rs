//! The context a worker-type implementation runs against: its scratch
//! directory, its stage argument, and the two ways it reaches the rest of
//! the system (log fan-in, resource submission).

use std::path::Path;

use chrono::Utc;
use message_bus::{publish, BusConnection, PublishOptions};
use object_storage::ObjectStorage;
use scheduler_types::{queues, JobId, JobLogEntry};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::warn;

use crate::error::HarnessError;

/// A resource a stage submitted: its deterministic key and the opaque URI
/// the storage collaborator resolved it to. `submit_resource` returns
/// `None` instead for zero-byte content — there is nothing to resolve.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceHandle {
    pub key: String,
    pub storage_uri: String,
}

pub struct TaskContext {
    pub job_id: JobId,
    pub stage_index: u32,
    pub worker_type: String,
    pub hostname: String,
    pub argument: serde_json::Value,
    /// This worker type's slice of system configuration, fetched fresh via
    /// `get_system_config` before the job was claimed.
    pub worker_config: serde_json::Value,
    pub(crate) scratch_dir: TempDir,
    pub(crate) bus: BusConnection,
    pub(crate) storage: Arc<dyn ObjectStorage>,
}

impl TaskContext {
    /// The per-task scratch directory. Removed when this context drops,
    /// whether `on_task` returns normally or its enclosing future is
    /// cancelled.
    pub fn scratch_path(&self) -> &Path {
        self.scratch_dir.path()
    }

    /// Fan a log line in to the scheduler's job log. Fire-and-forget: a
    /// failed publish is logged locally and otherwise ignored, since log
    /// delivery is not allowed to fail the task it describes.
    pub async fn report_log(&self, content: serde_json::Value) {
        let entry = JobLogEntry {
            time_stamp: Utc::now(),
            job_id: self.job_id,
            worker_type: self.worker_type.clone(),
            worker_hostname: self.hostname.clone(),
            content,
        };
        if let Err(err) = self.publish_log(&entry).await {
            warn!(%err, job_id = %self.job_id, "failed to publish job log entry");
        }
    }

    async fn publish_log(&self, entry: &JobLogEntry) -> Result<(), HarnessError> {
        let channel = self.bus.channel().await?;
        message_bus::declare_durable_queue(&channel, queues::INSERT_JOB_LOG_QUEUE).await?;
        let payload = serde_json::to_vec(entry)?;
        publish(&channel, queues::INSERT_JOB_LOG_QUEUE, &payload, PublishOptions::default()).await?;
        Ok(())
    }

    /// Upload a scratch-dir artifact under this stage's deterministic key
    /// prefix, returning the handle the next stage (or an operator) can
    /// resolve through the same storage collaborator. Zero-byte content is
    /// not uploaded and returns `None`.
    pub async fn submit_resource(
        &self,
        local_name: &str,
        content: &[u8],
    ) -> Result<Option<ResourceHandle>, HarnessError> {
        if content.is_empty() {
            return Ok(None);
        }
        let key = format!(
            "jobs/{job_id}/{stage_index}_{worker_type}/{local_name}",
            job_id = self.job_id,
            stage_index = self.stage_index,
            worker_type = self.worker_type,
        );
        let storage_uri = self.storage.upload(&key, content).await?;
        Ok(Some(ResourceHandle { key, storage_uri }))
    }
}
