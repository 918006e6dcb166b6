//! The claim/run/deliver loop: consume a job id off this worker type's
//! stage queue, claim it, run the handler, report back.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use message_bus::{ack, nack_requeue, BusConnection, ManualAckConsumer};
use rpc::RpcClient;
use scheduler_types::messages::{FocusJobRequest, FocusOutcome, SystemConfigRequest, UpdateJobRequest};
use scheduler_types::{queues, JobId, SystemLogEntry, TaskOutcome};
use task_harness::{Harness, TaskHandler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::{abort_queue_name, spawn_command_listener, yield_queue_name, CurrentTask, CurrentTaskSlot};
use crate::error::RuntimeError;

type FocusClient = RpcClient<FocusJobRequest, scheduler_types::messages::FocusJobResponse>;
type UpdateClient = RpcClient<UpdateJobRequest, scheduler_types::messages::UpdateJobResponse>;
type SystemConfigClient = RpcClient<SystemConfigRequest, scheduler_types::messages::SystemConfigResponse>;

pub struct WorkerRuntime {
    worker_type: String,
    hostname: String,
    bus: BusConnection,
    harness: Harness,
    handler: Arc<dyn TaskHandler>,
    system_config_client: SystemConfigClient,
    focus_client: FocusClient,
    update_client: UpdateClient,
    current: CurrentTaskSlot,
}

impl WorkerRuntime {
    pub async fn new(
        bus: BusConnection,
        worker_type: impl Into<String>,
        hostname: impl Into<String>,
        harness: Harness,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<Self, RuntimeError> {
        let system_config_client = RpcClient::new(&bus, queues::SYSTEM_CONFIG_QUEUE).await?;
        let focus_client = RpcClient::new(&bus, queues::FOCUS_JOB_QUEUE).await?;
        let update_client = RpcClient::new(&bus, queues::UPDATE_JOB_QUEUE).await?;
        Ok(Self {
            worker_type: worker_type.into(),
            hostname: hostname.into(),
            bus,
            harness,
            handler,
            system_config_client,
            focus_client,
            update_client,
            current: Arc::new(Mutex::new(None)),
        })
    }

    /// Runs until `shutdown` fires. A fired shutdown stops new jobs from
    /// being claimed and cancels whatever task is currently running via a
    /// graceful yield, same as a remote `yield_job` command.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), RuntimeError> {
        spawn_command_listener(
            self.bus.clone(),
            abort_queue_name(&self.hostname),
            self.current.clone(),
            |task: &CurrentTask| &task.abort_token,
        );
        spawn_command_listener(
            self.bus.clone(),
            yield_queue_name(&self.hostname),
            self.current.clone(),
            |task: &CurrentTask| &task.yield_token,
        );

        let channel = self.bus.channel().await?;
        let queue_name = queues::stage_queue(&self.worker_type);
        let mut consumer = ManualAckConsumer::new(channel, &queue_name, 1).await?;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(worker_type = %self.worker_type, "shutdown requested, no longer accepting new jobs");
                    break;
                }
                delivery = consumer.next() => {
                    match delivery {
                        Some(Ok(delivery)) => self.handle_delivery(delivery, &shutdown).await,
                        Some(Err(err)) => {
                            warn!(%err, "stage queue consumer error, stopping");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        self.report_going_offline().await;
        if let Err(err) = self.bus.close().await {
            warn!(%err, "failed to close broker connection cleanly during shutdown");
        }
        Ok(())
    }

    async fn report_going_offline(&self) {
        let entry = SystemLogEntry {
            time_stamp: Utc::now(),
            job_id: None,
            worker_type: self.worker_type.clone(),
            worker_hostname: self.hostname.clone(),
            content: serde_json::json!({ "event": "going_offline" }),
        };
        let result: Result<(), RuntimeError> = async {
            let channel = self.bus.channel().await?;
            message_bus::declare_durable_queue(&channel, queues::INSERT_SYSTEM_LOG_QUEUE).await?;
            let payload = serde_json::to_vec(&entry).map_err(rpc::RpcError::from)?;
            message_bus::publish(
                &channel,
                queues::INSERT_SYSTEM_LOG_QUEUE,
                &payload,
                message_bus::PublishOptions::default(),
            )
            .await?;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            warn!(%err, worker_type = %self.worker_type, "failed to report going-offline system log");
        }
    }

    async fn handle_delivery(&self, delivery: message_bus::Delivery, shutdown: &CancellationToken) {
        if shutdown.is_cancelled() {
            debug!("shutting down, rejecting stage dispatch for redelivery to a surviving worker");
            let _ = nack_requeue(&delivery).await;
            return;
        }

        let job_id: JobId = match serde_json::from_slice(&delivery.data) {
            Ok(job_id) => job_id,
            Err(err) => {
                warn!(%err, "dropping malformed stage dispatch payload");
                let _ = ack(&delivery).await;
                return;
            }
        };

        let worker_config = match self
            .system_config_client
            .call(&SystemConfigRequest {
                worker_type: self.worker_type.clone(),
            })
            .await
        {
            Ok(response) => response.worker_config,
            Err(err) => {
                warn!(%err, %job_id, "get_system_config call failed");
                let _ = nack_requeue(&delivery).await;
                return;
            }
        };

        let focus_response = match self
            .focus_client
            .call(&FocusJobRequest {
                job_id,
                hostname: self.hostname.clone(),
            })
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, %job_id, "focus_job call failed");
                let _ = nack_requeue(&delivery).await;
                return;
            }
        };
        if focus_response.outcome == FocusOutcome::Rejected {
            debug!(%job_id, "job already claimed or no longer claimable, skipping");
            let _ = ack(&delivery).await;
            return;
        }

        let context = focus_response.context;
        let stage_index = context.digest.current_worker;
        let Some(stage) = context.current_stage() else {
            warn!(%job_id, stage_index, "claimed job has no stage at its current index");
            let _ = ack(&delivery).await;
            return;
        };
        let argument = stage.worker_argument.clone();
        let worker_type = stage.worker_type.clone();

        let abort_token = CancellationToken::new();
        let yield_token = shutdown.child_token();
        *self.current.lock().unwrap() = Some(CurrentTask {
            job_id,
            abort_token: abort_token.clone(),
            yield_token: yield_token.clone(),
        });

        let task_future = self.harness.run(
            job_id,
            stage_index,
            &worker_type,
            &self.hostname,
            argument,
            worker_config,
            self.handler.as_ref(),
        );

        let outcome = race_task_against_cancellation(task_future, &abort_token, &yield_token).await;

        *self.current.lock().unwrap() = None;

        let deliverable = outcome.into_deliverable();
        let update_request = UpdateJobRequest {
            hostname: self.hostname.clone(),
            worker_type,
            stage_index,
            job_id,
            deliverable,
        };
        if let Err(err) = self.update_client.call(&update_request).await {
            warn!(%err, %job_id, "failed to deliver update_job; job will appear stuck until the next reconciliation");
        }

        // Acked last, per the claim/run/deliver contract: a crash any time
        // before this point leaves the message unacked, so the broker
        // redelivers it to a surviving worker instead of losing the job.
        if let Err(err) = ack(&delivery).await {
            warn!(%err, %job_id, "failed to ack stage dispatch");
        }
    }
}

/// Races the task future against the two cooperative cancellation signals
/// the runtime recognizes. Whichever resolves first decides the outcome;
/// dropping the losing branches drops the task future, which tears down
/// its `TaskContext` (and scratch directory) on the spot.
async fn race_task_against_cancellation(
    task_future: impl std::future::Future<Output = Result<TaskOutcome, task_harness::HarnessError>>,
    abort_token: &CancellationToken,
    yield_token: &CancellationToken,
) -> TaskOutcome {
    tokio::select! {
        result = task_future => result.unwrap_or_else(|err| TaskOutcome::UnexpectedFailure {
            type_name: "HarnessError".to_string(),
            backtrace: err.to_string(),
        }),
        _ = abort_token.cancelled() => TaskOutcome::AbortedByOperator,
        _ = yield_token.cancelled() => TaskOutcome::YieldedForShutdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test]
    async fn task_completing_first_wins() {
        let abort_token = CancellationToken::new();
        let yield_token = CancellationToken::new();
        let outcome = race_task_against_cancellation(
            async { Ok(TaskOutcome::Ok(serde_json::json!({ "ok": true }))) },
            &abort_token,
            &yield_token,
        )
        .await;
        assert!(matches!(outcome, TaskOutcome::Ok(_)));
    }

    #[tokio::test]
    async fn remote_abort_preempts_a_task_that_never_finishes() {
        let abort_token = CancellationToken::new();
        let yield_token = CancellationToken::new();
        abort_token.cancel();
        let outcome =
            race_task_against_cancellation(pending::<Result<TaskOutcome, task_harness::HarnessError>>(), &abort_token, &yield_token)
                .await;
        assert!(matches!(outcome, TaskOutcome::AbortedByOperator));
    }

    #[tokio::test]
    async fn graceful_yield_preempts_a_task_that_never_finishes() {
        let abort_token = CancellationToken::new();
        let yield_token = CancellationToken::new();
        yield_token.cancel();
        let outcome =
            race_task_against_cancellation(pending::<Result<TaskOutcome, task_harness::HarnessError>>(), &abort_token, &yield_token)
                .await;
        assert!(matches!(outcome, TaskOutcome::YieldedForShutdown));
    }

    #[tokio::test]
    async fn a_crashed_task_never_acks_so_the_broker_can_redeliver() {
        // `handle_delivery` only acks after `update_job` returns (see the
        // comment at its tail). A task future that never resolves — the
        // same shape a process crash mid-task leaves behind — means this
        // function never reaches that ack, so the delivery stays
        // unacknowledged and the broker redelivers it once this worker's
        // channel drops.
        let abort_token = CancellationToken::new();
        let yield_token = CancellationToken::new();
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            race_task_against_cancellation(
                pending::<Result<TaskOutcome, task_harness::HarnessError>>(),
                &abort_token,
                &yield_token,
            ),
        )
        .await;
        assert!(result.is_err(), "expected the race to still be pending, like an unacked delivery");
    }
}
