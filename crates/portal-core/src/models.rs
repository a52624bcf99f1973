//! Shared data models for the job queue and notification subsystem.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// JOBS
// =============================================================================

/// Kind of job to process. Closed set: adding a kind means adding a
/// [`JobPayload`] variant, so dispatch stays exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Resolve recipients and deliver a push notification.
    #[serde(rename = "notification:push")]
    NotificationPush,
    /// Delete old terminal-status notification records.
    #[serde(rename = "notification:cleanup")]
    NotificationCleanup,
}

impl JobKind {
    /// Stable string tag, used as the `kind` column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::NotificationPush => "notification:push",
            JobKind::NotificationCleanup => "notification:cleanup",
        }
    }

    /// Parse a stored tag back into a kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "notification:push" => Some(JobKind::NotificationPush),
            "notification:cleanup" => Some(JobKind::NotificationCleanup),
            _ => None,
        }
    }

    /// Default enqueue priority for this kind.
    pub fn default_priority(&self) -> i32 {
        match self {
            JobKind::NotificationPush => defaults::NOTIFICATION_PUSH_PRIORITY,
            JobKind::NotificationCleanup => defaults::NOTIFICATION_CLEANUP_PRIORITY,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a job in the queue.
///
/// Transitions are forward-only; `Completed` and `Failed` are terminal. A
/// `Delayed` job is treated as pending for selection once its ready time has
/// passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Delayed,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further transitions can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Typed job payload, one variant per [`JobKind`].
///
/// Serialized into the `payload` JSON column with an internal `kind` tag, so
/// a stored row deserializes straight into the right variant instead of going
/// through an untyped `JsonValue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum JobPayload {
    #[serde(rename = "notification:push")]
    NotificationPush(NotificationPushPayload),
    #[serde(rename = "notification:cleanup")]
    NotificationCleanup(NotificationCleanupPayload),
}

impl JobPayload {
    /// The kind this payload belongs to.
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::NotificationPush(_) => JobKind::NotificationPush,
            JobPayload::NotificationCleanup(_) => JobKind::NotificationCleanup,
        }
    }
}

/// Payload for [`JobKind::NotificationPush`]: the notification id plus the
/// recipient spec captured at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPushPayload {
    pub notification_id: Uuid,
    pub recipients: RecipientSpec,
}

/// Payload for [`JobKind::NotificationCleanup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationCleanupPayload {
    /// Delete terminal-status notifications older than this many days.
    pub older_than_days: i64,
}

/// A persisted unit of asynchronous work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    pub priority: i32,
    pub payload: JobPayload,
    pub attempts: i32,
    pub max_attempts: i32,
    /// Milliseconds after `created_at` before the job becomes eligible.
    pub delay_ms: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// The instant this job becomes eligible for selection.
    pub fn ready_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::milliseconds(self.delay_ms)
    }
}

/// Options accepted by `enqueue`. Unset fields fall back to the kind's
/// default priority, zero delay, and [`defaults::JOB_MAX_ATTEMPTS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueOptions {
    pub priority: Option<i32>,
    pub delay_ms: Option<i64>,
    pub max_attempts: Option<i32>,
}

impl EnqueueOptions {
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn delay_ms(mut self, delay_ms: i64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    pub fn max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Queue statistics summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub delayed: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    pub total: i64,
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Portal user roles used for role-based recipient resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Student,
    Teacher,
    Guardian,
    Coordinator,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "STUDENT",
            UserRole::Teacher => "TEACHER",
            UserRole::Guardian => "GUARDIAN",
            UserRole::Coordinator => "COORDINATOR",
            UserRole::Admin => "ADMIN",
        }
    }
}

/// Visual/semantic flavor of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
    Success,
}

/// Portal area a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Academic,
    System,
    Social,
    Administrative,
}

/// Delivery urgency. Maps onto the underlying job's integer priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

impl NotificationPriority {
    /// Job-queue priority for this urgency level.
    pub fn job_priority(&self) -> i32 {
        match self {
            NotificationPriority::Low => 2,
            NotificationPriority::Medium => 5,
            NotificationPriority::High => defaults::NOTIFICATION_PUSH_PRIORITY,
        }
    }
}

/// Notification record state. Independent of the underlying job's status;
/// the two are joined only by the notification id in the job payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Scheduled,
    Sent,
    Failed,
}

/// Who a notification targets: explicit user ids unioned with role lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipientSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<UserRole>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<Uuid>,
}

impl RecipientSpec {
    /// Target a set of roles.
    pub fn roles(roles: Vec<UserRole>) -> Self {
        Self {
            roles,
            user_ids: Vec::new(),
        }
    }

    /// Target specific users.
    pub fn users(user_ids: Vec<Uuid>) -> Self {
        Self {
            roles: Vec::new(),
            user_ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.user_ids.is_empty()
    }
}

/// A persisted notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    pub recipient_roles: Vec<UserRole>,
    pub recipient_ids: Vec<Uuid>,
    /// Number of users the recipient spec resolved to at delivery time.
    pub recipient_total: i32,
    /// Number of users the push transport confirmed delivery for.
    pub sent_count: i32,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request to create and dispatch a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    pub recipients: RecipientSpec,
    pub priority: NotificationPriority,
    /// When set and in the future, delivery is delayed until this instant.
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Message handed to the push transport for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}
