//! Core data model for the job-pipeline scheduler.
//!
//! This crate has no I/O of its own: it defines the shapes that the
//! persistence backend stores, the RPC layer carries, and the worker runtime
//! produces, so that every other crate in the workspace agrees on them.

pub mod context;
pub mod digest;
pub mod error;
pub mod exception;
pub mod job_id;
pub mod log;
pub mod messages;
pub mod queues;
pub mod stage;
pub mod status;
pub mod tag;

pub use context::JobContext;
pub use digest::JobDigest;
pub use error::SchedulerTypeError;
pub use exception::{Deliverable, JobException, TaskOutcome, WorkerException, WorkerExceptionCode};
pub use job_id::JobId;
pub use log::{JobLogEntry, SystemLogEntry};
pub use stage::{JobStage, NewJobStage};
pub use status::Status;
pub use tag::JobTag;
