//! The two hooks a worker-type implementation provides.

use async_trait::async_trait;
use scheduler_types::TaskOutcome;

use crate::context::TaskContext;

#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run the stage. Cancellation is delivered by dropping this future
    /// from the outside (see `worker-runtime`'s yield/abort handling), not
    /// by a flag checked from within.
    async fn on_task(&self, ctx: &TaskContext) -> TaskOutcome;

    /// Runs after `on_task` returns, win or lose, before the scratch
    /// directory is removed. Default is a no-op; override to flush
    /// artifacts that don't go through `submit_resource`.
    async fn on_clean(&self, _ctx: &TaskContext) {}
}
