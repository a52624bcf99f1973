//! Repository and collaborator traits.
//!
//! The scheduler and the notification dispatch consumer are written against
//! these traits; `portal-db` and `portal-push` provide the production
//! implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Job, JobPayload, JobStatus, Notification, PushMessage, QueueStats, UserRole,
};
use crate::Result;

/// Persistence for job records.
///
/// After insert, every mutation (status, timestamps, attempts, error) is made
/// exclusively by the scheduler during a poll cycle; producers only insert.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job. Status starts as `Pending`, or `Delayed` when
    /// `delay_ms > 0`. Returns the assigned id.
    async fn insert(
        &self,
        payload: JobPayload,
        priority: i32,
        delay_ms: i64,
        max_attempts: i32,
    ) -> Result<Uuid>;

    /// Select up to `limit` eligible jobs as of `now`: status `Pending`, or
    /// `Delayed` with `created_at + delay_ms <= now`. Ordered by priority
    /// descending, then creation time ascending.
    ///
    /// No row claiming is performed: this repository assumes a single
    /// scheduler instance per job table. Running more than one risks
    /// duplicate processing.
    async fn select_eligible(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<Job>>;

    /// Mark a job as `Processing`: set `processed_at` and increment
    /// `attempts`.
    async fn mark_processing(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Mark a job as `Completed` and set `completed_at`. Terminal.
    async fn complete(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Record a handler failure. While `attempts < max_attempts` the job is
    /// reset to `Pending` (eligible again next cycle, no added delay);
    /// otherwise it is marked `Failed` with `failed_at` set. The error
    /// message is recorded either way. Returns the resulting status.
    async fn fail(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<JobStatus>;

    /// Mark a job as `Failed` unconditionally, ignoring the remaining
    /// attempts budget. Used when no handler is registered for the kind.
    async fn fail_terminal(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<()>;

    /// Get a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Count jobs currently eligible or waiting (pending + delayed).
    async fn pending_count(&self) -> Result<i64>;

    /// Aggregate counts by status.
    async fn stats(&self) -> Result<QueueStats>;

    /// List the most recently created jobs.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>>;
}

/// Persistence for notification records.
///
/// Written by the dispatch handler only; independent of the job store.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a new notification record and return its id.
    async fn insert(&self, notification: &Notification) -> Result<Uuid>;

    /// Get a notification by id.
    async fn get(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Mark a notification as sent with its resolved/delivered counters.
    async fn mark_sent(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
        recipient_total: i32,
        sent_count: i32,
    ) -> Result<()>;

    /// Mark a notification as failed.
    async fn mark_failed(&self, id: Uuid) -> Result<()>;

    /// Delete terminal-status notifications created before `cutoff`.
    /// Returns the number of rows removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<i64>;

    /// List the most recently created notifications.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>>;
}

/// Resolves role tags to concrete user ids.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Return the ids of all active users holding any of `roles`.
    async fn resolve_roles(&self, roles: &[UserRole]) -> Result<Vec<Uuid>>;
}

/// Delivers a push message to a set of users.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Deliver `message` to each user in `user_ids` and return the number of
    /// successful deliveries. Individual delivery failures are absorbed and
    /// must not fail the batch.
    async fn deliver(&self, user_ids: &[Uuid], message: &PushMessage) -> Result<usize>;
}
