//! The scheduler: persistence plus the two side effects a state transition
//! can trigger — publishing the next stage's dispatch, and notifying a
//! claimed worker of a remote abort.

use std::sync::Arc;

use message_bus::{declare_durable_queue, publish, BusConnection, PublishOptions};
use persistence::Store;
use scheduler_types::messages::{
    AbortJobRequest, DispatchNext, FocusJobRequest, FocusJobResponse, FocusOutcome, NewJobRequest,
    SystemConfigRequest, SystemConfigResponse, UpdateJobRequest, UpdateJobResponse, YieldJobRequest,
};
use scheduler_types::{queues, JobId, JobLogEntry, SystemLogEntry};
use tracing::{info, warn};

use crate::config::SystemConfig;
use crate::error::SchedulerError;

pub struct Scheduler {
    store: Arc<Store>,
    bus: BusConnection,
    system_config: SystemConfig,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, bus: BusConnection, system_config: SystemConfig) -> Self {
        Self {
            store,
            bus,
            system_config,
        }
    }

    /// Aborts every job left claimed or queued by a previous, now-dead
    /// process. Call once, before serving any RPC.
    pub async fn recover(&self) -> Result<u64, SchedulerError> {
        let swept = self.store.sweep_crashed().await?;
        if swept > 0 {
            info!(swept, "aborted non-terminal jobs left over from a previous run");
        }
        Ok(swept)
    }

    pub fn get_system_config(&self, request: &SystemConfigRequest) -> SystemConfigResponse {
        SystemConfigResponse {
            storage: self.system_config.storage.clone(),
            worker_config: self.system_config.worker_config_for(&request.worker_type),
        }
    }

    pub async fn new_job(&self, request: &NewJobRequest) -> Result<JobId, SchedulerError> {
        let job_id = self.store.new_job(request).await?;
        let first_stage = &request.job_workers[0];
        self.dispatch(job_id, &first_stage.worker_type).await?;
        Ok(job_id)
    }

    pub async fn focus_job(&self, request: &FocusJobRequest) -> Result<FocusJobResponse, SchedulerError> {
        let (outcome, context) = self.store.focus_job(request.job_id, &request.hostname).await?;
        Ok(FocusJobResponse {
            outcome: match outcome {
                persistence::FocusOutcome::Focused => FocusOutcome::Focused,
                persistence::FocusOutcome::Rejected => FocusOutcome::Rejected,
            },
            context,
        })
    }

    pub async fn update_job(&self, request: &UpdateJobRequest) -> Result<UpdateJobResponse, SchedulerError> {
        let outcome = self
            .store
            .update_job(request.job_id, &request.hostname, request.stage_index, &request.deliverable)
            .await?;

        let dispatch = match &outcome.dispatch {
            Some(next) => {
                self.dispatch(next.job_id, &next.next_worker_type).await?;
                Some(DispatchNext {
                    job_id: next.job_id,
                    next_worker_type: next.next_worker_type.clone(),
                })
            }
            None => None,
        };
        Ok(UpdateJobResponse { dispatch })
    }

    /// Marks the job aborted in the store, then — if it was claimed —
    /// notifies the claimant out of band. The database write is the
    /// authoritative outcome; the notification is best-effort, since a
    /// worker that never receives it will still find the job aborted the
    /// next time it calls `update_job`.
    pub async fn abort_job(&self, request: &AbortJobRequest) -> Result<(), SchedulerError> {
        let outcome = self.store.abort_job(request.job_id).await?;
        if let Some(hostname) = outcome.previous_claimant {
            self.notify_command(&queues::abort_queue(&hostname), request.job_id).await;
        }
        Ok(())
    }

    /// Asks a worker to yield its current job at the next cooperative
    /// checkpoint. Purely a courtesy signal: the worker runtime still calls
    /// `update_job` with a yielded deliverable on its own once it acts on it.
    pub async fn yield_job(&self, request: &YieldJobRequest) -> Result<(), SchedulerError> {
        let context = self
            .store
            .get_job(request.job_id)
            .await?
            .ok_or(SchedulerError::NoCurrentStage(request.job_id))?;
        if context.digest.is_claimed() {
            self.notify_command(&queues::yield_queue(&context.digest.current_worker_hostname), request.job_id)
                .await;
        }
        Ok(())
    }

    pub async fn restart_job(&self, job_id: JobId, from_stage: i32) -> Result<(), SchedulerError> {
        self.store.restart_job(job_id, from_stage).await?;
        let context = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(SchedulerError::NoCurrentStage(job_id))?;
        let stage = context.current_stage().ok_or(SchedulerError::NoCurrentStage(job_id))?;
        self.dispatch(job_id, &stage.worker_type).await?;
        Ok(())
    }

    pub async fn insert_job_log(&self, entry: &JobLogEntry) -> Result<(), SchedulerError> {
        Ok(self.store.insert_job_log(entry).await?)
    }

    pub async fn insert_system_log(&self, entry: &SystemLogEntry) -> Result<(), SchedulerError> {
        Ok(self.store.insert_system_log(entry).await?)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    async fn dispatch(&self, job_id: JobId, worker_type: &str) -> Result<(), SchedulerError> {
        let channel = self.bus.channel().await?;
        let queue_name = queues::stage_queue(worker_type);
        declare_durable_queue(&channel, &queue_name).await?;
        let payload = serde_json::to_vec(&job_id)?;
        publish(&channel, &queue_name, &payload, PublishOptions::default()).await?;
        Ok(())
    }

    async fn notify_command(&self, queue_name: &str, job_id: JobId) {
        let result: Result<(), SchedulerError> = async {
            let channel = self.bus.channel().await?;
            declare_durable_queue(&channel, queue_name).await?;
            let payload = serde_json::to_vec(&job_id)?;
            publish(&channel, queue_name, &payload, PublishOptions::default()).await?;
            Ok(())
        }
        .await;

        if let Err(err) = result {
            warn!(%err, queue_name, %job_id, "failed to deliver worker command, relying on the worker's own poll");
        }
    }
}
