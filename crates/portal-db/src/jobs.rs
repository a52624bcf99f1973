//! Job repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use portal_core::{Error, Job, JobPayload, JobRepository, JobStatus, QueueStats, Result};

/// PostgreSQL implementation of [`JobRepository`] over the `job_queue` table.
///
/// Selection performs no row claiming (`FOR UPDATE SKIP LOCKED` or
/// otherwise): the queue assumes exactly one scheduler instance per table.
/// Running a second instance against the same database risks duplicate
/// processing.
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

const JOB_COLUMNS: &str = "id, kind, status, priority, payload, attempts, max_attempts, \
     delay_ms, error, created_at, processed_at, completed_at, failed_at";

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert JobStatus to string for the database.
    fn status_to_str(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Delayed => "delayed",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Convert string from the database to JobStatus.
    fn str_to_status(s: &str) -> JobStatus {
        match s {
            "pending" => JobStatus::Pending,
            "delayed" => JobStatus::Delayed,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending, // fallback
        }
    }

    /// Parse a job row into a Job struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<Job> {
        let payload_value: serde_json::Value = row.get("payload");
        let payload: JobPayload = serde_json::from_value(payload_value)?;
        let status: String = row.get("status");

        Ok(Job {
            id: row.get("id"),
            kind: payload.kind(),
            status: Self::str_to_status(&status),
            priority: row.get("priority"),
            payload,
            attempts: row.get("attempts"),
            max_attempts: row.get("max_attempts"),
            delay_ms: row.get("delay_ms"),
            error: row.get("error"),
            created_at: row.get("created_at"),
            processed_at: row.get("processed_at"),
            completed_at: row.get("completed_at"),
            failed_at: row.get("failed_at"),
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn insert(
        &self,
        payload: JobPayload,
        priority: i32,
        delay_ms: i64,
        max_attempts: i32,
    ) -> Result<Uuid> {
        let job_id = Uuid::now_v7();
        let now = Utc::now();
        let kind = payload.kind();
        let status = if delay_ms > 0 {
            JobStatus::Delayed
        } else {
            JobStatus::Pending
        };
        let payload_json = serde_json::to_value(&payload)?;

        sqlx::query(
            "INSERT INTO job_queue (id, kind, status, priority, payload, attempts, max_attempts, delay_ms, created_at)
             VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8)",
        )
        .bind(job_id)
        .bind(kind.as_str())
        .bind(Self::status_to_str(status))
        .bind(priority)
        .bind(&payload_json)
        .bind(max_attempts)
        .bind(delay_ms)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(job_id)
    }

    async fn select_eligible(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS}
             FROM job_queue
             WHERE status = 'pending'
                OR (status = 'delayed'
                    AND created_at + delay_ms * interval '1 millisecond' <= $1)
             ORDER BY priority DESC, created_at ASC
             LIMIT $2"
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_job_row).collect()
    }

    async fn mark_processing(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE job_queue
             SET status = 'processing', processed_at = $1, attempts = attempts + 1
             WHERE id = $2",
        )
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE job_queue SET status = 'completed', completed_at = $1 WHERE id = $2",
        )
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<JobStatus> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let (attempts, max_attempts): (i32, i32) =
            sqlx::query_as("SELECT attempts, max_attempts FROM job_queue WHERE id = $1")
                .bind(job_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;

        let status = if attempts < max_attempts {
            // Budget remains: back to pending, eligible on the next cycle.
            sqlx::query(
                "UPDATE job_queue SET status = 'pending', error = $1 WHERE id = $2",
            )
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            JobStatus::Pending
        } else {
            sqlx::query(
                "UPDATE job_queue
                 SET status = 'failed', failed_at = $1, error = $2
                 WHERE id = $3",
            )
            .bind(now)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            JobStatus::Failed
        };

        tx.commit().await.map_err(Error::Database)?;
        Ok(status)
    }

    async fn fail_terminal(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE job_queue
             SET status = 'failed', failed_at = $1, error = $2
             WHERE id = $3",
        )
        .bind(now)
        .bind(error)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM job_queue WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_queue WHERE status IN ('pending', 'delayed')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'delayed') AS delayed,
                COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) AS total
             FROM job_queue",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            pending: row.get::<i64, _>("pending"),
            delayed: row.get::<i64, _>("delayed"),
            processing: row.get::<i64, _>("processing"),
            completed: row.get::<i64, _>("completed"),
            failed: row.get::<i64, _>("failed"),
            total: row.get::<i64, _>("total"),
        })
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS}
             FROM job_queue
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_job_row).collect()
    }
}
