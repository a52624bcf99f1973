//! Structured logging field name constants.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, retry or fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |

/// Subsystem originating the log event.
/// Values: "jobs", "db", "push", "server"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "enqueue", "run_cycle", "deliver"
pub const OPERATION: &str = "op";

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Job kind tag.
pub const JOB_KIND: &str = "job_kind";

/// Notification UUID being dispatched.
pub const NOTIFICATION_ID: &str = "notification_id";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of jobs selected in a poll cycle.
pub const BATCH: &str = "batch";

/// Attempt counter for the current execution.
pub const ATTEMPT: &str = "attempt";
