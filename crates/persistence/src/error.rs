use scheduler_types::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("a job must have at least one stage")]
    ZeroStages,

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {0}: stored status is not a recognized value")]
    CorruptStatus(JobId),

    #[error("restart stage index out of range for job {0}")]
    StageOutOfRange(JobId),

    #[error("conditional update rejected: job {0} did not match the expected state")]
    Conflict(JobId),
}
