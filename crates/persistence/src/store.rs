//! The embedded store: one SQLite database, one writer connection, and the
//! conditional `UPDATE`s that arbitrate claims and result delivery.
//!
//! Concurrency here is deliberately boring. `SqlitePool` is capped at a
//! single connection so "the database serializes writers" is a fact about
//! the pool, not an aspiration about isolation levels; every state
//! transition is still expressed as a guarded `UPDATE` so the guard remains
//! correct if that cap is ever lifted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use scheduler_types::{
    Deliverable, JobContext, JobDigest, JobId, JobLogEntry, JobStage, JobTag, NewJobRequest,
    Status, SystemLogEntry,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    Focused,
    Rejected,
}

/// Which column `list_digests` orders by. The listing is always newest-first
/// on whichever column is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestSort {
    ModifiedTime,
    CreatedTime,
}

impl DigestSort {
    fn column(self) -> &'static str {
        match self {
            DigestSort::ModifiedTime => "modified_time",
            DigestSort::CreatedTime => "created_time",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchNext {
    pub job_id: JobId,
    pub next_worker_type: String,
}

#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub dispatch: Option<DispatchNext>,
}

#[derive(Debug, Clone, Default)]
pub struct AbortOutcome {
    pub changed: bool,
    /// Set when the job was claimed at the moment of abort, so the caller
    /// can follow up with a remote abort RPC to this hostname.
    pub previous_claimant: Option<String>,
}

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    /// Aborts every job left in a non-terminal status, run once at startup
    /// before the server starts serving. A job with no live worker runtime
    /// backing it cannot be trusted to still be running.
    pub async fn sweep_crashed(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_digests SET status = 'aborted', current_worker_hostname = '', modified_time = ? \
             WHERE status IN ('pending', 'in_progress', 'waiting')",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn new_job(&self, request: &NewJobRequest) -> Result<JobId, StoreError> {
        if request.job_workers.is_empty() {
            return Err(StoreError::ZeroStages);
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let inserted = sqlx::query(
            "INSERT INTO job_digests (created_time, modified_time, status, current_worker_hostname, current_worker) \
             VALUES (?, ?, ?, '', 0)",
        )
        .bind(now)
        .bind(now)
        .bind(Status::Pending.as_str())
        .execute(&mut *tx)
        .await?;
        let job_id = JobId::new(inserted.last_insert_rowid() as u32);

        for (index, stage) in request.job_workers.iter().enumerate() {
            sqlx::query(
                "INSERT INTO job_stages (job_id, stage_index, worker_type, worker_argument, worker_result) \
                 VALUES (?, ?, ?, ?, NULL)",
            )
            .bind(job_id.as_u32() as i64)
            .bind(index as i64)
            .bind(&stage.worker_type)
            .bind(serde_json::to_string(&stage.worker_argument)?)
            .execute(&mut *tx)
            .await?;
        }

        for (key, value) in &request.tags {
            sqlx::query("INSERT INTO job_tags (job_id, key, value) VALUES (?, ?, ?)")
                .bind(job_id.as_u32() as i64)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(job_id)
    }

    pub async fn get_job(&self, job_id: JobId) -> Result<Option<JobContext>, StoreError> {
        let Some(digest) = self.fetch_digest(&self.pool, job_id).await? else {
            return Ok(None);
        };
        let stages = self.fetch_stages(&self.pool, job_id).await?;
        let tags = self.fetch_tags(&self.pool, job_id).await?;
        Ok(Some(JobContext {
            digest,
            stages,
            tags,
        }))
    }

    pub async fn list_digests(&self, sort: DigestSort, skip: i64, limit: i64) -> Result<Vec<JobDigest>, StoreError> {
        let sql = format!(
            "SELECT job_id, created_time, modified_time, status, current_worker_hostname, current_worker \
             FROM job_digests ORDER BY {} DESC, job_id DESC LIMIT ? OFFSET ?",
            sort.column()
        );
        let rows = sqlx::query(&sql).bind(limit).bind(skip).fetch_all(&self.pool).await?;
        rows.into_iter().map(digest_from_row).collect()
    }

    pub async fn count_digests(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM job_digests").fetch_one(&self.pool).await?;
        Ok(row.try_get("n")?)
    }

    /// Claim arbitration. Accepted iff the digest is currently claimable,
    /// unowned, and strictly older than `now` — the ordinary case whenever
    /// the system clock advances between calls, and the thing that makes a
    /// second concurrent claim lose once the first has committed.
    pub async fn focus_job(&self, job_id: JobId, hostname: &str) -> Result<(FocusOutcome, JobContext), StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_digests SET status = 'in_progress', current_worker_hostname = ?, modified_time = ? \
             WHERE job_id = ? AND status IN ('pending', 'waiting') \
               AND current_worker_hostname = '' AND modified_time < ?",
        )
        .bind(hostname)
        .bind(now)
        .bind(job_id.as_u32() as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let outcome = if result.rows_affected() == 1 {
            FocusOutcome::Focused
        } else {
            FocusOutcome::Rejected
        };
        let context = self.get_job(job_id).await?.ok_or(StoreError::NotFound(job_id))?;
        Ok((outcome, context))
    }

    pub async fn update_job(
        &self,
        job_id: JobId,
        hostname: &str,
        stage_index: u32,
        deliverable: &Deliverable,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        if deliverable.is_yield() {
            let result = guarded_release(&mut tx, job_id, hostname, stage_index, now, "waiting", None).await?;
            if result.rows_affected() != 1 {
                tx.rollback().await?;
                return Err(StoreError::Conflict(job_id));
            }
            tx.commit().await?;
            return Ok(UpdateOutcome { dispatch: None });
        }

        let result_blob = serde_json::to_string(deliverable)?;
        sqlx::query("UPDATE job_stages SET worker_result = ? WHERE job_id = ? AND stage_index = ?")
            .bind(&result_blob)
            .bind(job_id.as_u32() as i64)
            .bind(stage_index as i64)
            .execute(&mut *tx)
            .await?;

        if deliverable.is_failure() {
            let result = guarded_release(&mut tx, job_id, hostname, stage_index, now, "aborted", None).await?;
            if result.rows_affected() != 1 {
                tx.rollback().await?;
                return Err(StoreError::Conflict(job_id));
            }
            tx.commit().await?;
            return Ok(UpdateOutcome { dispatch: None });
        }

        let stage_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM job_stages WHERE job_id = ?")
            .bind(job_id.as_u32() as i64)
            .fetch_one(&mut *tx)
            .await?
            .try_get("n")?;
        let next_index = stage_index + 1;

        let dispatch = if (next_index as i64) < stage_count {
            let result = guarded_release(&mut tx, job_id, hostname, stage_index, now, "waiting", Some(next_index)).await?;
            if result.rows_affected() != 1 {
                tx.rollback().await?;
                return Err(StoreError::Conflict(job_id));
            }
            let next_worker_type: String = sqlx::query(
                "SELECT worker_type FROM job_stages WHERE job_id = ? AND stage_index = ?",
            )
            .bind(job_id.as_u32() as i64)
            .bind(next_index as i64)
            .fetch_one(&mut *tx)
            .await?
            .try_get("worker_type")?;
            Some(DispatchNext {
                job_id,
                next_worker_type,
            })
        } else {
            // Clamp to the last valid stage index rather than writing
            // `stage_count`, which would point one past the final stage.
            let last_index = (stage_count - 1).max(0) as u32;
            let result = guarded_release(&mut tx, job_id, hostname, stage_index, now, "finished", Some(last_index)).await?;
            if result.rows_affected() != 1 {
                tx.rollback().await?;
                return Err(StoreError::Conflict(job_id));
            }
            None
        };

        tx.commit().await?;
        Ok(UpdateOutcome { dispatch })
    }

    pub async fn abort_job(&self, job_id: JobId) -> Result<AbortOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(digest) = self.fetch_digest(&mut *tx, job_id).await? else {
            tx.rollback().await?;
            return Err(StoreError::NotFound(job_id));
        };
        if digest.status.is_terminal() {
            tx.rollback().await?;
            return Ok(AbortOutcome::default());
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_digests SET status = 'aborted', current_worker_hostname = '', modified_time = ? \
             WHERE job_id = ? AND status = ?",
        )
        .bind(now)
        .bind(job_id.as_u32() as i64)
        .bind(digest.status.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(StoreError::Conflict(job_id));
        }
        tx.commit().await?;

        let previous_claimant = if digest.status == Status::InProgress {
            Some(digest.current_worker_hostname)
        } else {
            None
        };
        Ok(AbortOutcome {
            changed: true,
            previous_claimant,
        })
    }

    /// `from_stage = -1` means "restart at the last stage"; any other value
    /// is the zero-based stage index to resume from.
    pub async fn restart_job(&self, job_id: JobId, from_stage: i32) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(digest) = self.fetch_digest(&mut *tx, job_id).await? else {
            tx.rollback().await?;
            return Err(StoreError::NotFound(job_id));
        };
        if !digest.status.is_terminal() {
            tx.rollback().await?;
            return Err(StoreError::Conflict(job_id));
        }

        let stage_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM job_stages WHERE job_id = ?")
            .bind(job_id.as_u32() as i64)
            .fetch_one(&mut *tx)
            .await?
            .try_get("n")?;
        let index = if from_stage < 0 {
            (stage_count - 1).max(0) as u32
        } else {
            from_stage as u32
        };
        if index as i64 >= stage_count {
            tx.rollback().await?;
            return Err(StoreError::StageOutOfRange(job_id));
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_digests SET status = 'pending', current_worker_hostname = '', current_worker = ?, modified_time = ? \
             WHERE job_id = ? AND status = ?",
        )
        .bind(index as i64)
        .bind(now)
        .bind(job_id.as_u32() as i64)
        .bind(digest.status.as_str())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(StoreError::Conflict(job_id));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_job_log(&self, entry: &JobLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO job_logs (time_stamp, job_id, worker_type, worker_hostname, content) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.time_stamp)
        .bind(entry.job_id.as_u32() as i64)
        .bind(&entry.worker_type)
        .bind(&entry.worker_hostname)
        .bind(serde_json::to_string(&entry.content)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_system_log(&self, entry: &SystemLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO system_logs (time_stamp, job_id, worker_type, worker_hostname, content) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.time_stamp)
        .bind(entry.job_id.map(|id| id.as_u32() as i64))
        .bind(&entry.worker_type)
        .bind(&entry.worker_hostname)
        .bind(serde_json::to_string(&entry.content)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn job_logs(&self, job_id: JobId, skip: i64, limit: i64) -> Result<Vec<JobLogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT time_stamp, job_id, worker_type, worker_hostname, content FROM job_logs \
             WHERE job_id = ? ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(job_id.as_u32() as i64)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let content: String = row.try_get("content")?;
                Ok(JobLogEntry {
                    time_stamp: row.try_get("time_stamp")?,
                    job_id: JobId::new(row.try_get::<i64, _>("job_id")? as u32),
                    worker_type: row.try_get("worker_type")?,
                    worker_hostname: row.try_get("worker_hostname")?,
                    content: serde_json::from_str(&content)?,
                })
            })
            .collect()
    }

    pub async fn count_job_logs(&self, job_id: JobId) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM job_logs WHERE job_id = ?")
            .bind(job_id.as_u32() as i64)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// All job logs across every job, newest-insertion-first, for the
    /// system-wide job-log display.
    pub async fn all_job_logs(&self, skip: i64, limit: i64) -> Result<Vec<JobLogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT time_stamp, job_id, worker_type, worker_hostname, content FROM job_logs \
             ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let content: String = row.try_get("content")?;
                Ok(JobLogEntry {
                    time_stamp: row.try_get("time_stamp")?,
                    job_id: JobId::new(row.try_get::<i64, _>("job_id")? as u32),
                    worker_type: row.try_get("worker_type")?,
                    worker_hostname: row.try_get("worker_hostname")?,
                    content: serde_json::from_str(&content)?,
                })
            })
            .collect()
    }

    pub async fn count_all_job_logs(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM job_logs").fetch_one(&self.pool).await?;
        Ok(row.try_get("n")?)
    }

    pub async fn system_logs(&self, skip: i64, limit: i64) -> Result<Vec<SystemLogEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT time_stamp, job_id, worker_type, worker_hostname, content FROM system_logs \
             ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let content: String = row.try_get("content")?;
                let job_id: Option<i64> = row.try_get("job_id")?;
                Ok(SystemLogEntry {
                    time_stamp: row.try_get("time_stamp")?,
                    job_id: job_id.map(|id| JobId::new(id as u32)),
                    worker_type: row.try_get("worker_type")?,
                    worker_hostname: row.try_get("worker_hostname")?,
                    content: serde_json::from_str(&content)?,
                })
            })
            .collect()
    }

    pub async fn count_system_logs(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM system_logs").fetch_one(&self.pool).await?;
        Ok(row.try_get("n")?)
    }

    pub async fn set_tag(&self, job_id: JobId, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO job_tags (job_id, key, value) VALUES (?, ?, ?) \
             ON CONFLICT (job_id, key) DO UPDATE SET value = excluded.value",
        )
        .bind(job_id.as_u32() as i64)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_tag(&self, job_id: JobId, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM job_tags WHERE job_id = ? AND key = ?")
            .bind(job_id.as_u32() as i64)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| Ok(row.try_get("value")?)).transpose()
    }

    pub async fn delete_tag(&self, job_id: JobId, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM job_tags WHERE job_id = ? AND key = ?")
            .bind(job_id.as_u32() as i64)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_tag_keys(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT key FROM job_tags ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|row| Ok(row.try_get("key")?)).collect()
    }

    pub async fn search_by_tag(&self, key: &str, value: &str, skip: i64, limit: i64) -> Result<Vec<JobId>, StoreError> {
        let rows = sqlx::query(
            "SELECT job_id FROM job_tags WHERE key = ? AND value = ? ORDER BY job_id ASC LIMIT ? OFFSET ?",
        )
        .bind(key)
        .bind(value)
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| Ok(JobId::new(row.try_get::<i64, _>("job_id")? as u32)))
            .collect()
    }

    pub async fn count_tag_matches(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM job_tags WHERE key = ? AND value = ?")
            .bind(key)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    async fn fetch_digest<'e, E>(&self, executor: E, job_id: JobId) -> Result<Option<JobDigest>, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let row = sqlx::query(
            "SELECT job_id, created_time, modified_time, status, current_worker_hostname, current_worker \
             FROM job_digests WHERE job_id = ?",
        )
        .bind(job_id.as_u32() as i64)
        .fetch_optional(executor)
        .await?;
        row.map(digest_from_row).transpose()
    }

    async fn fetch_stages<'e, E>(&self, executor: E, job_id: JobId) -> Result<Vec<JobStage>, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let rows = sqlx::query(
            "SELECT worker_type, worker_argument, worker_result FROM job_stages \
             WHERE job_id = ? ORDER BY stage_index ASC",
        )
        .bind(job_id.as_u32() as i64)
        .fetch_all(executor)
        .await?;

        rows.into_iter()
            .map(|row| {
                let worker_argument: String = row.try_get("worker_argument")?;
                let worker_result: Option<String> = row.try_get("worker_result")?;
                Ok(JobStage {
                    worker_type: row.try_get("worker_type")?,
                    worker_argument: serde_json::from_str(&worker_argument)?,
                    worker_result: worker_result.map(|blob| serde_json::from_str(&blob)).transpose()?,
                })
            })
            .collect()
    }

    async fn fetch_tags<'e, E>(&self, executor: E, job_id: JobId) -> Result<HashMap<String, String>, StoreError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let rows = sqlx::query("SELECT key, value FROM job_tags WHERE job_id = ?")
            .bind(job_id.as_u32() as i64)
            .fetch_all(executor)
            .await?;
        rows.into_iter()
            .map(|row| Ok((row.try_get("key")?, row.try_get("value")?)))
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
async fn guarded_release<'c>(
    tx: &mut sqlx::Transaction<'c, sqlx::Sqlite>,
    job_id: JobId,
    hostname: &str,
    stage_index: u32,
    now: DateTime<Utc>,
    new_status: &str,
    new_current_worker: Option<u32>,
) -> Result<sqlx::sqlite::SqliteQueryResult, StoreError> {
    let current_worker = new_current_worker.unwrap_or(stage_index);
    let result = sqlx::query(
        "UPDATE job_digests SET status = ?, current_worker_hostname = '', current_worker = ?, modified_time = ? \
         WHERE job_id = ? AND status = 'in_progress' AND current_worker_hostname = ? \
           AND current_worker = ? AND modified_time < ?",
    )
    .bind(new_status)
    .bind(current_worker as i64)
    .bind(now)
    .bind(job_id.as_u32() as i64)
    .bind(hostname)
    .bind(stage_index as i64)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(result)
}

fn digest_from_row(row: sqlx::sqlite::SqliteRow) -> Result<JobDigest, StoreError> {
    let job_id = JobId::new(row.try_get::<i64, _>("job_id")? as u32);
    let status: String = row.try_get("status")?;
    Ok(JobDigest {
        job_id,
        created_time: row.try_get("created_time")?,
        modified_time: row.try_get("modified_time")?,
        status: status.parse().map_err(|_| StoreError::CorruptStatus(job_id))?,
        current_worker_hostname: row.try_get("current_worker_hostname")?,
        current_worker: row.try_get::<i64, _>("current_worker")? as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_types::NewJobStage;
    use serde_json::json;

    async fn new_two_stage_job(store: &Store) -> JobId {
        store
            .new_job(&NewJobRequest {
                job_workers: vec![
                    NewJobStage {
                        worker_type: "fetch".to_string(),
                        worker_argument: json!({"url": "http://example.test"}),
                    },
                    NewJobStage {
                        worker_type: "index".to_string(),
                        worker_argument: json!({}),
                    },
                ],
                tags: HashMap::from([("project".to_string(), "alpha".to_string())]),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn new_job_rejects_zero_stages() {
        let store = Store::connect_in_memory().await.unwrap();
        let result = store
            .new_job(&NewJobRequest {
                job_workers: vec![],
                tags: HashMap::new(),
            })
            .await;
        assert!(matches!(result, Err(StoreError::ZeroStages)));
    }

    #[tokio::test]
    async fn claim_then_double_claim_is_rejected() {
        let store = Store::connect_in_memory().await.unwrap();
        let job_id = new_two_stage_job(&store).await;

        let (first, _) = store.focus_job(job_id, "worker-a").await.unwrap();
        assert_eq!(first, FocusOutcome::Focused);

        let (second, context) = store.focus_job(job_id, "worker-b").await.unwrap();
        assert_eq!(second, FocusOutcome::Rejected);
        assert_eq!(context.digest.current_worker_hostname, "worker-a");
    }

    #[tokio::test]
    async fn clean_completion_of_middle_stage_dispatches_next() {
        let store = Store::connect_in_memory().await.unwrap();
        let job_id = new_two_stage_job(&store).await;
        store.focus_job(job_id, "worker-a").await.unwrap();

        let outcome = store
            .update_job(job_id, "worker-a", 0, &Deliverable::ok(json!({"bytes": 10})))
            .await
            .unwrap();
        let dispatch = outcome.dispatch.expect("next stage dispatch");
        assert_eq!(dispatch.next_worker_type, "index");

        let context = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(context.digest.status, Status::Waiting);
        assert_eq!(context.digest.current_worker, 1);
    }

    #[tokio::test]
    async fn clean_completion_of_last_stage_finishes_without_overshoot() {
        let store = Store::connect_in_memory().await.unwrap();
        let job_id = new_two_stage_job(&store).await;
        store.focus_job(job_id, "worker-a").await.unwrap();
        store
            .update_job(job_id, "worker-a", 0, &Deliverable::ok(json!({})))
            .await
            .unwrap();
        store.focus_job(job_id, "worker-a").await.unwrap();

        let outcome = store
            .update_job(job_id, "worker-a", 1, &Deliverable::ok(json!({"indexed": true})))
            .await
            .unwrap();
        assert!(outcome.dispatch.is_none());

        let context = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(context.digest.status, Status::Finished);
        // Clamped to the last valid stage index, never `stages.len()`.
        assert_eq!(context.digest.current_worker, 1);
    }

    #[tokio::test]
    async fn restart_accepts_negative_one_as_last_stage() {
        let store = Store::connect_in_memory().await.unwrap();
        let job_id = new_two_stage_job(&store).await;
        store.abort_job(job_id).await.unwrap();

        store.restart_job(job_id, -1).await.unwrap();
        let context = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(context.digest.status, Status::Pending);
        assert_eq!(context.digest.current_worker, 1);
    }

    #[tokio::test]
    async fn sweep_aborts_non_terminal_jobs() {
        let store = Store::connect_in_memory().await.unwrap();
        let job_id = new_two_stage_job(&store).await;
        let swept = store.sweep_crashed().await.unwrap();
        assert_eq!(swept, 1);
        let context = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(context.digest.status, Status::Aborted);
    }
}
