use thiserror::Error;

/// Errors shared across the scheduler crates that don't already have a more
/// specific home (see `persistence::StoreError`, `rpc::RpcError`, etc.).
#[derive(Debug, Error)]
pub enum SchedulerTypeError {
    #[error("job id parse error: {0}")]
    JobId(#[from] crate::job_id::JobIdParseError),
}
