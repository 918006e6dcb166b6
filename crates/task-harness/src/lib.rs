//! Per-task scratch directory, log fan-in, and resource submission shared
//! by every worker-type implementation.
//!
//! A worker-type implementation is just a [`TaskHandler`]; everything about
//! where its scratch files live, how its log lines reach the scheduler, and
//! how its output artifacts are named and stored is handled here so that
//! concern never has to be reinvented per worker type.

pub mod context;
pub mod error;
pub mod handler;
pub mod harness;

pub use context::{ResourceHandle, TaskContext};
pub use error::HarnessError;
pub use handler::TaskHandler;
pub use harness::Harness;

#[cfg(test)]
mod tests {
    use scheduler_types::JobId;

    // `Harness::run` needs a live broker to exercise end-to-end (every
    // `TaskContext` holds a `BusConnection` for `report_log`), so these
    // cover the two pieces that don't: the resource key layout, and scratch
    // directory teardown.

    #[test]
    fn deterministic_resource_key_matches_job_stage_worker_layout() {
        let job_id = JobId::new(0x1a2b3c4d);
        let key = format!(
            "jobs/{job_id}/{stage}_{worker_type}/{name}",
            stage = 0,
            worker_type = "fetch",
            name = "out.txt"
        );
        assert_eq!(key, "jobs/1a2b3c4d/0_fetch/out.txt");
    }

    #[test]
    fn scratch_dir_is_removed_once_its_tempdir_drops() {
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::Builder::new().prefix("job-test-").tempdir_in(root.path()).unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(path.join("marker"), b"x").unwrap();
        assert!(path.join("marker").exists());

        drop(scratch);
        assert!(!path.exists());
    }
}
