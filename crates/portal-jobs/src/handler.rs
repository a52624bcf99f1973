//! Job handler trait and execution context.

use async_trait::async_trait;
use uuid::Uuid;

use portal_core::{Job, JobKind, JobPayload};

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job: Job,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    /// The job's id.
    pub fn job_id(&self) -> Uuid {
        self.job.id
    }

    /// The typed payload for this job.
    pub fn payload(&self) -> &JobPayload {
        &self.job.payload
    }

    /// Which attempt this execution is (1-based; `mark_processing` has
    /// already incremented the stored counter by the time a handler runs).
    pub fn attempt(&self) -> i32 {
        self.job.attempts + 1
    }
}

/// Result of job execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// Job completed successfully.
    Success,
    /// Job failed with an error message. The scheduler decides between retry
    /// and terminal failure based on the remaining attempts budget.
    Failed(String),
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job kind this handler processes.
    fn kind(&self) -> JobKind;

    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;
}

/// No-op handler for testing.
pub struct NoOpHandler {
    kind: JobKind,
}

impl NoOpHandler {
    /// Create a new no-op handler for the given job kind.
    pub fn new(kind: JobKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl JobHandler for NoOpHandler {
    fn kind(&self) -> JobKind {
        self.kind
    }

    async fn execute(&self, _ctx: JobContext) -> JobResult {
        JobResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use portal_core::{JobStatus, NotificationCleanupPayload};

    fn cleanup_job() -> Job {
        Job {
            id: Uuid::new_v4(),
            kind: JobKind::NotificationCleanup,
            status: JobStatus::Pending,
            priority: 0,
            payload: JobPayload::NotificationCleanup(NotificationCleanupPayload {
                older_than_days: 30,
            }),
            attempts: 0,
            max_attempts: 3,
            delay_ms: 0,
            error: None,
            created_at: Utc::now(),
            processed_at: None,
            completed_at: None,
            failed_at: None,
        }
    }

    #[test]
    fn test_job_context_accessors() {
        let job = cleanup_job();
        let id = job.id;

        let ctx = JobContext::new(job);
        assert_eq!(ctx.job_id(), id);
        assert_eq!(ctx.attempt(), 1);
        assert!(matches!(
            ctx.payload(),
            JobPayload::NotificationCleanup(p) if p.older_than_days == 30
        ));
    }

    #[tokio::test]
    async fn test_noop_handler() {
        let handler = NoOpHandler::new(JobKind::NotificationCleanup);
        assert_eq!(handler.kind(), JobKind::NotificationCleanup);

        let result = handler.execute(JobContext::new(cleanup_job())).await;
        assert_eq!(result, JobResult::Success);
    }
}
