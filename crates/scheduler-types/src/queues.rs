//! Queue naming conventions for the broker, shared by the scheduler server
//! and the worker runtime so the two sides can never drift apart.

/// The durable queue a stage's workers consume from.
pub fn stage_queue(worker_type: &str) -> String {
    format!("stage.{worker_type}")
}

/// Per-worker command queue for a remote abort request.
pub fn abort_queue(hostname: &str) -> String {
    format!("workers.{hostname}.abort_job")
}

/// Per-worker command queue for a remote graceful-yield request.
pub fn yield_queue(hostname: &str) -> String {
    format!("workers.{hostname}.yield_job")
}

pub const SYSTEM_CONFIG_QUEUE: &str = "scheduler.get_system_config";
pub const FOCUS_JOB_QUEUE: &str = "scheduler.focus_job";
pub const UPDATE_JOB_QUEUE: &str = "scheduler.update_job";
pub const INSERT_JOB_LOG_QUEUE: &str = "scheduler.insert_job_log";
pub const INSERT_SYSTEM_LOG_QUEUE: &str = "scheduler.insert_system_log";
