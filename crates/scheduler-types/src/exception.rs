//! The deliverable: the stage result a worker hands back via `update_job`,
//! and the exception taxonomy that shapes it.
//!
//! Codes are dotted strings `<namespace>.<Name>` (e.g. `kworker.AbortedException`,
//! `kbuilder.ChecksumMismatch`), matching the source's module-qualified
//! exception names so operators can grep logs across both systems.

use serde::{Deserialize, Serialize};

/// A well-known worker-exception code. `Aborted` and `Yielded` drive core
/// state transitions; any other runtime fault is `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerExceptionCode {
    Aborted,
    Yielded,
    General,
}

impl WorkerExceptionCode {
    pub fn dotted(&self) -> &'static str {
        match self {
            Self::Aborted => "kworker.AbortedException",
            Self::Yielded => "kworker.YieldedException",
            Self::General => "kworker.GeneralException",
        }
    }
}

/// A runtime-level failure attributable to the worker or its environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerException {
    pub code: WorkerExceptionCode,
    /// The original Rust type name, recorded for `General` faults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
}

impl WorkerException {
    pub fn aborted() -> Self {
        Self {
            code: WorkerExceptionCode::Aborted,
            type_name: None,
            backtrace: None,
        }
    }

    pub fn yielded() -> Self {
        Self {
            code: WorkerExceptionCode::Yielded,
            type_name: None,
            backtrace: None,
        }
    }

    pub fn general(type_name: impl Into<String>, backtrace: impl Into<String>) -> Self {
        Self {
            code: WorkerExceptionCode::General,
            type_name: Some(type_name.into()),
            backtrace: Some(backtrace.into()),
        }
    }
}

/// An expected, per-stage failure attributable to the job's inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobException {
    /// Dotted code, e.g. `kbuilder.ChecksumMismatch`.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

/// The stage result blob (plus optional exception structures) a worker hands
/// back to the scheduler via `update_job`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deliverable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_exception: Option<JobException>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_exception: Option<WorkerException>,
}

impl Deliverable {
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            job_exception: None,
            worker_exception: None,
        }
    }

    pub fn job_failed(exception: JobException) -> Self {
        Self {
            result: None,
            job_exception: Some(exception),
            worker_exception: None,
        }
    }

    pub fn worker_failed(exception: WorkerException) -> Self {
        Self {
            result: None,
            job_exception: None,
            worker_exception: Some(exception),
        }
    }

    pub fn is_yield(&self) -> bool {
        matches!(
            &self.worker_exception,
            Some(WorkerException {
                code: WorkerExceptionCode::Yielded,
                ..
            })
        )
    }

    pub fn is_failure(&self) -> bool {
        self.job_exception.is_some() || self.worker_exception.is_some()
    }
}

/// The tagged outcome of running a single task, produced by the worker
/// runtime's exception-to-result mapper (see `worker-runtime`).
///
/// This is the Rust-native replacement for the source's thrown-and-caught
/// control flow: cancellation and domain failure are both ordinary values.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Ok(serde_json::Value),
    JobFailure {
        code: String,
        content: Option<serde_json::Value>,
    },
    AbortedByOperator,
    YieldedForShutdown,
    UnexpectedFailure {
        type_name: String,
        backtrace: String,
    },
}

impl TaskOutcome {
    /// Fold into the deliverable shape the scheduler's `update_job` expects.
    pub fn into_deliverable(self) -> Deliverable {
        match self {
            TaskOutcome::Ok(value) => Deliverable::ok(value),
            TaskOutcome::JobFailure { code, content } => Deliverable::job_failed(JobException {
                code,
                backtrace: None,
                content,
            }),
            TaskOutcome::AbortedByOperator => Deliverable::worker_failed(WorkerException::aborted()),
            TaskOutcome::YieldedForShutdown => Deliverable::worker_failed(WorkerException::yielded()),
            TaskOutcome::UnexpectedFailure {
                type_name,
                backtrace,
            } => Deliverable::worker_failed(WorkerException::general(type_name, backtrace)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_deliverable_is_detected() {
        let deliverable = TaskOutcome::YieldedForShutdown.into_deliverable();
        assert!(deliverable.is_yield());
        assert!(deliverable.is_failure());
    }

    #[test]
    fn clean_deliverable_is_not_a_failure() {
        let deliverable = TaskOutcome::Ok(serde_json::json!({"ok": true})).into_deliverable();
        assert!(!deliverable.is_failure());
        assert!(!deliverable.is_yield());
    }

    #[test]
    fn job_failure_carries_code_and_content() {
        let deliverable = TaskOutcome::JobFailure {
            code: "kbuilder.ChecksumMismatch".to_string(),
            content: Some(serde_json::json!({"expected": "abc"})),
        }
        .into_deliverable();
        let job_exception = deliverable.job_exception.expect("job exception");
        assert_eq!(job_exception.code, "kbuilder.ChecksumMismatch");
        assert!(deliverable.worker_exception.is_none());
    }

    #[test]
    fn aborted_exception_code_is_dotted() {
        assert_eq!(
            WorkerExceptionCode::Aborted.dotted(),
            "kworker.AbortedException"
        );
    }
}
