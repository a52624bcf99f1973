//! Job scheduler: owns the recurring poll cycle that selects eligible jobs,
//! dispatches them to registered handlers, and updates record state.
//!
//! The scheduler is an explicitly owned object constructed and started by the
//! application entrypoint — there is no ambient singleton. Exactly one
//! scheduler instance may run against a given job table: selection performs
//! no row claiming, so a second instance would risk duplicate processing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use portal_core::{
    defaults, EnqueueOptions, Job, JobKind, JobPayload, JobRepository, JobStatus, Result,
};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Error message recorded on jobs whose kind has no registered handler.
pub const MISSING_HANDLER_ERROR: &str = "no handler registered";

/// Configuration for the job scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of jobs selected per poll cycle.
    pub batch_size: i64,
    /// Whether to run the poll loop at all.
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            batch_size: defaults::JOB_BATCH_SIZE,
            enabled: true,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_SCHEDULER_ENABLED` | `true` | Enable/disable the poll loop |
    /// | `JOB_POLL_INTERVAL_MS` | `5000` | Fixed poll interval |
    /// | `JOB_BATCH_SIZE` | `10` | Jobs selected per cycle |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_SCHEDULER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        let batch_size = std::env::var("JOB_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(defaults::JOB_BATCH_SIZE)
            .max(1);

        Self {
            poll_interval_ms,
            batch_size,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the per-cycle batch size.
    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable the poll loop.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler to halt future cycles. Returns immediately; jobs
    /// already dispatched in the in-flight cycle may still complete.
    pub fn stop(&self) {
        // Full channel means a signal is already pending; nothing to do.
        let _ = self.shutdown_tx.try_send(());
    }

    /// Signal the scheduler and wait for it to drain: the call returns only
    /// after the in-flight cycle (if any) has settled and the loop has
    /// exited, so shutdown is deterministic.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.try_send(());
        if let Err(e) = self.task.await {
            error!(subsystem = "jobs", error = ?e, "Scheduler task panicked");
        }
    }
}

/// Job scheduler owning the poll-and-dispatch loop.
pub struct JobScheduler {
    jobs: Arc<dyn JobRepository>,
    config: SchedulerConfig,
    handlers: Arc<RwLock<HashMap<JobKind, Arc<dyn JobHandler>>>>,
}

impl JobScheduler {
    /// Create a new scheduler over the given job store.
    pub fn new(jobs: Arc<dyn JobRepository>, config: SchedulerConfig) -> Self {
        Self {
            jobs,
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a new job. Synchronous to the caller: the job is persisted
    /// (status `Pending`, or `Delayed` when a positive delay is given) and
    /// its id returned without waiting for execution. A persistence error
    /// surfaces directly.
    pub async fn enqueue(&self, payload: JobPayload, opts: EnqueueOptions) -> Result<Uuid> {
        let kind = payload.kind();
        let priority = opts.priority.unwrap_or_else(|| kind.default_priority());
        let delay_ms = opts.delay_ms.unwrap_or(0).max(0);
        let max_attempts = opts
            .max_attempts
            .unwrap_or(defaults::JOB_MAX_ATTEMPTS)
            .max(1);

        let job_id = self
            .jobs
            .insert(payload, priority, delay_ms, max_attempts)
            .await?;

        debug!(
            subsystem = "jobs",
            op = "enqueue",
            job_id = %job_id,
            job_kind = %kind,
            priority,
            delay_ms,
            "Job enqueued"
        );
        Ok(job_id)
    }

    /// Install the handler for its job kind, replacing any prior one.
    pub async fn register_handler<H: JobHandler + 'static>(&self, handler: H) {
        let kind = handler.kind();
        let mut handlers = self.handlers.write().await;
        if handlers.insert(kind, Arc::new(handler)).is_some() {
            debug!(subsystem = "jobs", job_kind = %kind, "Replaced job handler");
        } else {
            debug!(subsystem = "jobs", job_kind = %kind, "Registered job handler");
        }
    }

    /// Remove the handler for a kind. Jobs of that kind selected afterwards
    /// fail terminally with a missing-handler error.
    pub async fn unregister_handler(&self, kind: JobKind) {
        let mut handlers = self.handlers.write().await;
        handlers.remove(&kind);
        debug!(subsystem = "jobs", job_kind = %kind, "Unregistered job handler");
    }

    /// Start the poll loop and return a handle for control. Callers keep
    /// their own `Arc` clone for enqueueing.
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        SchedulerHandle { shutdown_tx, task }
    }

    /// The poll loop. One cycle runs at a time: the loop awaits the cycle
    /// before sleeping, so a slow batch delays the next tick instead of
    /// overlapping it.
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!(subsystem = "jobs", "Job scheduler is disabled, not starting");
            return;
        }

        info!(
            subsystem = "jobs",
            poll_interval_ms = self.config.poll_interval_ms,
            batch_size = self.config.batch_size,
            "Job scheduler started"
        );

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!(subsystem = "jobs", "Job scheduler received shutdown signal");
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!(subsystem = "jobs", "Job scheduler received shutdown signal");
                    break;
                }
                _ = sleep(poll_interval) => {}
            }
        }

        info!(subsystem = "jobs", "Job scheduler stopped");
    }

    /// Run one poll cycle: select eligible jobs and dispatch the batch
    /// concurrently, waiting for every member to settle.
    pub(crate) async fn run_cycle(&self) {
        let now = Utc::now();
        let batch = match self.jobs.select_eligible(self.config.batch_size, now).await {
            Ok(batch) => batch,
            Err(e) => {
                // Transient: the next tick retries independently.
                error!(
                    subsystem = "jobs",
                    op = "select",
                    error = %e,
                    "Eligibility query failed; retrying next cycle"
                );
                return;
            }
        };

        if batch.is_empty() {
            return;
        }

        debug!(subsystem = "jobs", batch = batch.len(), "Dispatching job batch");

        let mut tasks = JoinSet::new();
        for job in batch {
            let dispatcher = self.dispatcher();
            tasks.spawn(async move {
                dispatcher.execute_job(job).await;
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(subsystem = "jobs", error = ?e, "Job task panicked");
            }
        }
    }

    /// Clone the references needed by a spawned job task.
    fn dispatcher(&self) -> JobDispatcher {
        JobDispatcher {
            jobs: self.jobs.clone(),
            handlers: self.handlers.clone(),
        }
    }

    /// Aggregate queue counts from the underlying store.
    pub async fn stats(&self) -> Result<portal_core::QueueStats> {
        self.jobs.stats().await
    }
}

/// Lightweight reference bundle for executing a single job in a spawned task.
struct JobDispatcher {
    jobs: Arc<dyn JobRepository>,
    handlers: Arc<RwLock<HashMap<JobKind, Arc<dyn JobHandler>>>>,
}

impl JobDispatcher {
    /// Execute a single selected job through its registered handler and
    /// record the outcome.
    async fn execute_job(self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;
        let kind = job.kind;
        let attempt = job.attempts + 1;

        if let Err(e) = self.jobs.mark_processing(job_id, Utc::now()).await {
            error!(
                subsystem = "jobs",
                job_id = %job_id,
                error = %e,
                "Failed to mark job as processing"
            );
            return;
        }

        info!(
            subsystem = "jobs",
            job_id = %job_id,
            job_kind = %kind,
            attempt,
            "Processing job"
        );

        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&kind).cloned()
        };

        let handler = match handler {
            Some(handler) => handler,
            None => {
                // Terminal regardless of the remaining attempts budget:
                // retrying cannot conjure a handler into existence.
                warn!(
                    subsystem = "jobs",
                    job_id = %job_id,
                    job_kind = %kind,
                    "No handler registered for job kind"
                );
                if let Err(e) = self
                    .jobs
                    .fail_terminal(job_id, MISSING_HANDLER_ERROR, Utc::now())
                    .await
                {
                    error!(
                        subsystem = "jobs",
                        job_id = %job_id,
                        error = %e,
                        "Failed to mark job as failed"
                    );
                }
                return;
            }
        };

        match handler.execute(JobContext::new(job)).await {
            JobResult::Success => {
                if let Err(e) = self.jobs.complete(job_id, Utc::now()).await {
                    error!(
                        subsystem = "jobs",
                        job_id = %job_id,
                        error = %e,
                        "Failed to mark job as completed"
                    );
                } else {
                    info!(
                        subsystem = "jobs",
                        job_id = %job_id,
                        job_kind = %kind,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job completed successfully"
                    );
                }
            }
            JobResult::Failed(error) => {
                match self.jobs.fail(job_id, &error, Utc::now()).await {
                    Ok(JobStatus::Pending) => {
                        warn!(
                            subsystem = "jobs",
                            job_id = %job_id,
                            job_kind = %kind,
                            attempt,
                            error = %error,
                            "Job failed, will retry"
                        );
                    }
                    Ok(_) => {
                        warn!(
                            subsystem = "jobs",
                            job_id = %job_id,
                            job_kind = %kind,
                            attempt,
                            error = %error,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Job failed permanently"
                        );
                    }
                    Err(e) => {
                        error!(
                            subsystem = "jobs",
                            job_id = %job_id,
                            error = %e,
                            "Failed to record job failure"
                        );
                    }
                }
            }
        }
    }
}
