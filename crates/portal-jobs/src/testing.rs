//! In-memory repository implementations and handler doubles for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use portal_core::{
    Error, Job, JobKind, JobPayload, JobRepository, JobStatus, Notification,
    NotificationRepository, NotificationStatus, QueueStats, RecipientDirectory, Result, UserRole,
};

use crate::handler::{JobContext, JobHandler, JobResult};

/// In-memory [`JobRepository`] mirroring the SQL implementation's semantics.
#[derive(Default)]
pub struct MemoryJobRepository {
    jobs: Mutex<Vec<Job>>,
    /// When set, every call fails — simulates a database outage.
    failing: Mutex<bool>,
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    fn check(&self) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err(Error::Internal("simulated store failure".to_string()));
        }
        Ok(())
    }

    fn with_job<R>(&self, id: Uuid, f: impl FnOnce(&mut Job) -> R) -> Result<R> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| Error::NotFound(format!("job {id}")))?;
        Ok(f(job))
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn insert(
        &self,
        payload: JobPayload,
        priority: i32,
        delay_ms: i64,
        max_attempts: i32,
    ) -> Result<Uuid> {
        self.check()?;
        let id = Uuid::now_v7();
        let status = if delay_ms > 0 {
            JobStatus::Delayed
        } else {
            JobStatus::Pending
        };

        self.jobs.lock().unwrap().push(Job {
            id,
            kind: payload.kind(),
            status,
            priority,
            payload,
            attempts: 0,
            max_attempts,
            delay_ms,
            error: None,
            created_at: Utc::now(),
            processed_at: None,
            completed_at: None,
            failed_at: None,
        });
        Ok(id)
    }

    async fn select_eligible(&self, limit: i64, now: DateTime<Utc>) -> Result<Vec<Job>> {
        self.check()?;
        let jobs = self.jobs.lock().unwrap();
        let mut eligible: Vec<Job> = jobs
            .iter()
            .filter(|j| match j.status {
                JobStatus::Pending => true,
                JobStatus::Delayed => j.ready_at() <= now,
                _ => false,
            })
            .cloned()
            .collect();

        eligible.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        eligible.truncate(limit as usize);
        Ok(eligible)
    }

    async fn mark_processing(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.check()?;
        self.with_job(job_id, |job| {
            job.status = JobStatus::Processing;
            job.processed_at = Some(now);
            job.attempts += 1;
        })
    }

    async fn complete(&self, job_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.check()?;
        self.with_job(job_id, |job| {
            job.status = JobStatus::Completed;
            job.completed_at = Some(now);
        })
    }

    async fn fail(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<JobStatus> {
        self.check()?;
        self.with_job(job_id, |job| {
            job.error = Some(error.to_string());
            if job.attempts < job.max_attempts {
                job.status = JobStatus::Pending;
            } else {
                job.status = JobStatus::Failed;
                job.failed_at = Some(now);
            }
            job.status
        })
    }

    async fn fail_terminal(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<()> {
        self.check()?;
        self.with_job(job_id, |job| {
            job.status = JobStatus::Failed;
            job.failed_at = Some(now);
            job.error = Some(error.to_string());
        })
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        self.check()?;
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .cloned())
    }

    async fn pending_count(&self) -> Result<i64> {
        self.check()?;
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter()
            .filter(|j| matches!(j.status, JobStatus::Pending | JobStatus::Delayed))
            .count() as i64)
    }

    async fn stats(&self) -> Result<QueueStats> {
        self.check()?;
        let jobs = self.jobs.lock().unwrap();
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count() as i64;
        Ok(QueueStats {
            pending: count(JobStatus::Pending),
            delayed: count(JobStatus::Delayed),
            processing: count(JobStatus::Processing),
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            total: jobs.len() as i64,
        })
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>> {
        self.check()?;
        let mut jobs = self.jobs.lock().unwrap().clone();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit as usize);
        Ok(jobs)
    }
}

/// In-memory [`NotificationRepository`].
#[derive(Default)]
pub struct MemoryNotificationRepository {
    records: Mutex<Vec<Notification>>,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<Uuid> {
        self.records.lock().unwrap().push(notification.clone());
        Ok(notification.id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
        recipient_total: i32,
        sent_count: i32,
    ) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NotificationNotFound(id))?;
        record.status = NotificationStatus::Sent;
        record.sent_at = Some(sent_at);
        record.recipient_total = recipient_total;
        record.sent_count = sent_count;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(Error::NotificationNotFound(id))?;
        record.status = NotificationStatus::Failed;
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<i64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|n| {
            !(matches!(
                n.status,
                NotificationStatus::Sent | NotificationStatus::Failed
            ) && n.created_at < cutoff)
        });
        Ok((before - records.len()) as i64)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>> {
        let mut records = self.records.lock().unwrap().clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit as usize);
        Ok(records)
    }
}

/// [`RecipientDirectory`] backed by a fixed role → users map.
#[derive(Default)]
pub struct StaticDirectory {
    by_role: HashMap<UserRole, Vec<Uuid>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: UserRole, users: Vec<Uuid>) -> Self {
        self.by_role.insert(role, users);
        self
    }
}

#[async_trait]
impl RecipientDirectory for StaticDirectory {
    async fn resolve_roles(&self, roles: &[UserRole]) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        for role in roles {
            if let Some(users) = self.by_role.get(role) {
                ids.extend_from_slice(users);
            }
        }
        Ok(ids)
    }
}

/// Handler that records every execution and always succeeds.
pub struct CountingHandler {
    kind: JobKind,
    pub executed: Arc<Mutex<Vec<Uuid>>>,
}

impl CountingHandler {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl JobHandler for CountingHandler {
    fn kind(&self) -> JobKind {
        self.kind
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        self.executed.lock().unwrap().push(ctx.job_id());
        JobResult::Success
    }
}

/// Handler that always fails with a fixed message.
pub struct FailingHandler {
    kind: JobKind,
    pub executed: Arc<Mutex<Vec<Uuid>>>,
}

impl FailingHandler {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl JobHandler for FailingHandler {
    fn kind(&self) -> JobKind {
        self.kind
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        self.executed.lock().unwrap().push(ctx.job_id());
        JobResult::Failed("handler exploded".to_string())
    }
}
