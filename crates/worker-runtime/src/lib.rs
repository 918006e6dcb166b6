//! The worker runtime: claim a job, run its current stage, report back.
//!
//! Cancellation — both a remote abort and a graceful yield, whether
//! requested by the scheduler or by this process's own shutdown signal —
//! is cooperative and expressed as ordinary `tokio` cancellation rather
//! than a thrown-and-caught exception, mirroring [`scheduler_types::TaskOutcome`].

mod commands;
pub mod error;
pub mod runtime;
pub mod signals;

pub use error::RuntimeError;
pub use runtime::WorkerRuntime;
pub use signals::install_shutdown_handler;
