//! # portal-jobs
//!
//! Background job queue and notification dispatch for the portal backend.
//!
//! This crate provides:
//! - A priority-aware, Postgres-backed job queue with delayed execution
//! - A polling scheduler that dispatches batches to registered handlers
//! - Bounded retries with per-job attempt budgets
//! - The notification dispatch consumer (push delivery + record cleanup)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use portal_db::Database;
//! use portal_jobs::{JobScheduler, NotificationService, SchedulerConfig};
//! use portal_push::GatewayPushClient;
//!
//! let db = Database::connect("postgres://...").await?;
//! let scheduler = Arc::new(JobScheduler::new(
//!     Arc::new(db.jobs),
//!     SchedulerConfig::from_env(),
//! ));
//!
//! // Registers the notification handlers on the scheduler.
//! let notifications = NotificationService::new(
//!     scheduler.clone(),
//!     Arc::new(db.notifications),
//!     Arc::new(db.recipients),
//!     Arc::new(GatewayPushClient::from_env()?),
//! )
//! .await;
//!
//! let handle = scheduler.start();
//! // ...
//! handle.shutdown().await; // drain: waits for the in-flight cycle
//! ```
//!
//! ## Single-writer invariant
//!
//! Selection performs no row claiming. Exactly one scheduler instance may
//! run against a given job table; a second instance risks processing the
//! same job twice.

pub mod handler;
pub mod notification_handler;
pub mod notifications;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

// Re-export core types
pub use portal_core::*;

pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use notification_handler::{NotificationCleanupHandler, PushDispatchHandler};
pub use notifications::NotificationService;
pub use scheduler::{JobScheduler, SchedulerConfig, SchedulerHandle, MISSING_HANDLER_ERROR};

/// Default maximum attempts for failing jobs.
pub const DEFAULT_MAX_ATTEMPTS: i32 = portal_core::defaults::JOB_MAX_ATTEMPTS;

/// Default polling interval for job processing (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = portal_core::defaults::JOB_POLL_INTERVAL_MS;
