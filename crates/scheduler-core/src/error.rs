use scheduler_types::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] persistence::StoreError),

    #[error(transparent)]
    Bus(#[from] message_bus::BusError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("job {0} has no current stage to dispatch")]
    NoCurrentStage(JobId),
}
