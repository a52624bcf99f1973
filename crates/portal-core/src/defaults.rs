//! Centralized default constants for the portal backend.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default scheduler poll interval in milliseconds.
pub const JOB_POLL_INTERVAL_MS: u64 = 5_000;

/// Default number of jobs selected per poll cycle.
pub const JOB_BATCH_SIZE: i64 = 10;

/// Default maximum attempt count for failing jobs.
pub const JOB_MAX_ATTEMPTS: i32 = 3;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Enqueue priority for push-notification jobs (high urgency tier).
pub const NOTIFICATION_PUSH_PRIORITY: i32 = 8;

/// Enqueue priority for notification cleanup jobs (background tier).
pub const NOTIFICATION_CLEANUP_PRIORITY: i32 = 1;

/// Default retention window for terminal-status notifications, in days.
pub const NOTIFICATION_RETENTION_DAYS: i64 = 30;

// =============================================================================
// PUSH GATEWAY
// =============================================================================

/// Default push gateway base URL.
pub const PUSH_GATEWAY_URL: &str = "http://127.0.0.1:4100";

/// Timeout for push gateway requests in seconds.
pub const PUSH_TIMEOUT_SECS: u64 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_defaults_are_sane() {
        const {
            assert!(JOB_BATCH_SIZE > 0);
            assert!(JOB_MAX_ATTEMPTS >= 1);
            assert!(JOB_POLL_INTERVAL_MS > 0);
        }
    }

    #[test]
    fn push_priority_outranks_cleanup() {
        const {
            assert!(NOTIFICATION_PUSH_PRIORITY > NOTIFICATION_CLEANUP_PRIORITY);
        }
    }
}
