//! Wires the scheduler's three RPCs and its two log-intake queues to a
//! [`Scheduler`]. Each is a long-running task; `spawn_all` fires them all
//! and returns immediately.

use std::sync::Arc;

use message_bus::{ack, nack_requeue, BusConnection, ManualAckConsumer};
use rpc::RpcServer;
use scheduler_core::Scheduler;
use scheduler_types::messages::{FocusJobRequest, SystemConfigRequest, UpdateJobRequest};
use scheduler_types::{queues, JobLogEntry, SystemLogEntry};
use tracing::warn;

pub async fn spawn_all(scheduler: Arc<Scheduler>, bus: BusConnection) -> anyhow::Result<()> {
    spawn_system_config_server(scheduler.clone(), &bus).await?;
    spawn_focus_job_server(scheduler.clone(), &bus).await?;
    spawn_update_job_server(scheduler.clone(), &bus).await?;
    spawn_job_log_consumer(scheduler.clone(), &bus).await?;
    spawn_system_log_consumer(scheduler, &bus).await?;
    Ok(())
}

async fn spawn_system_config_server(scheduler: Arc<Scheduler>, bus: &BusConnection) -> anyhow::Result<()> {
    let server = RpcServer::new(bus, queues::SYSTEM_CONFIG_QUEUE).await?;
    tokio::spawn(async move {
        server
            .serve(move |request: SystemConfigRequest| {
                let scheduler = scheduler.clone();
                async move { Ok(scheduler.get_system_config(&request)) }
            })
            .await;
    });
    Ok(())
}

async fn spawn_focus_job_server(scheduler: Arc<Scheduler>, bus: &BusConnection) -> anyhow::Result<()> {
    let server = RpcServer::new(bus, queues::FOCUS_JOB_QUEUE).await?;
    tokio::spawn(async move {
        server
            .serve(move |request: FocusJobRequest| {
                let scheduler = scheduler.clone();
                async move { scheduler.focus_job(&request).await.map_err(anyhow::Error::from) }
            })
            .await;
    });
    Ok(())
}

async fn spawn_update_job_server(scheduler: Arc<Scheduler>, bus: &BusConnection) -> anyhow::Result<()> {
    let server = RpcServer::new(bus, queues::UPDATE_JOB_QUEUE).await?;
    tokio::spawn(async move {
        server
            .serve(move |request: UpdateJobRequest| {
                let scheduler = scheduler.clone();
                async move { scheduler.update_job(&request).await.map_err(anyhow::Error::from) }
            })
            .await;
    });
    Ok(())
}

async fn spawn_job_log_consumer(scheduler: Arc<Scheduler>, bus: &BusConnection) -> anyhow::Result<()> {
    let channel = bus.channel().await?;
    let mut consumer = ManualAckConsumer::new(channel, queues::INSERT_JOB_LOG_QUEUE, 1).await?;
    tokio::spawn(async move {
        while let Some(delivery) = consumer.next().await {
            let Ok(delivery) = delivery else { break };
            match serde_json::from_slice::<JobLogEntry>(&delivery.data) {
                Ok(entry) => {
                    if let Err(err) = scheduler.insert_job_log(&entry).await {
                        warn!(%err, "failed to persist job log entry");
                        let _ = nack_requeue(&delivery).await;
                        continue;
                    }
                    let _ = ack(&delivery).await;
                }
                Err(err) => {
                    warn!(%err, "dropping malformed job log entry");
                    let _ = ack(&delivery).await;
                }
            }
        }
    });
    Ok(())
}

async fn spawn_system_log_consumer(scheduler: Arc<Scheduler>, bus: &BusConnection) -> anyhow::Result<()> {
    let channel = bus.channel().await?;
    let mut consumer = ManualAckConsumer::new(channel, queues::INSERT_SYSTEM_LOG_QUEUE, 1).await?;
    tokio::spawn(async move {
        while let Some(delivery) = consumer.next().await {
            let Ok(delivery) = delivery else { break };
            match serde_json::from_slice::<SystemLogEntry>(&delivery.data) {
                Ok(entry) => {
                    if let Err(err) = scheduler.insert_system_log(&entry).await {
                        warn!(%err, "failed to persist system log entry");
                        let _ = nack_requeue(&delivery).await;
                        continue;
                    }
                    let _ = ack(&delivery).await;
                }
                Err(err) => {
                    warn!(%err, "dropping malformed system log entry");
                    let _ = ack(&delivery).await;
                }
            }
        }
    });
    Ok(())
}
