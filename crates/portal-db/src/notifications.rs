//! Notification repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use portal_core::{
    Error, Notification, NotificationCategory, NotificationKind, NotificationPriority,
    NotificationRepository, NotificationStatus, Result, UserRole,
};

/// PostgreSQL implementation of [`NotificationRepository`] over the
/// `notifications` table.
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

const NOTIFICATION_COLUMNS: &str = "id, title, message, kind, category, priority, status, \
     recipient_roles, recipient_ids, recipient_total, sent_count, \
     scheduled_for, sent_at, created_at";

impl PgNotificationRepository {
    /// Create a new PgNotificationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn kind_to_str(kind: NotificationKind) -> &'static str {
        match kind {
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
            NotificationKind::Success => "success",
        }
    }

    fn str_to_kind(s: &str) -> NotificationKind {
        match s {
            "warning" => NotificationKind::Warning,
            "error" => NotificationKind::Error,
            "success" => NotificationKind::Success,
            _ => NotificationKind::Info, // fallback
        }
    }

    fn category_to_str(category: NotificationCategory) -> &'static str {
        match category {
            NotificationCategory::Academic => "academic",
            NotificationCategory::System => "system",
            NotificationCategory::Social => "social",
            NotificationCategory::Administrative => "administrative",
        }
    }

    fn str_to_category(s: &str) -> NotificationCategory {
        match s {
            "academic" => NotificationCategory::Academic,
            "social" => NotificationCategory::Social,
            "administrative" => NotificationCategory::Administrative,
            _ => NotificationCategory::System, // fallback
        }
    }

    fn priority_to_str(priority: NotificationPriority) -> &'static str {
        match priority {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
        }
    }

    fn str_to_priority(s: &str) -> NotificationPriority {
        match s {
            "low" => NotificationPriority::Low,
            "high" => NotificationPriority::High,
            _ => NotificationPriority::Medium, // fallback
        }
    }

    fn status_to_str(status: NotificationStatus) -> &'static str {
        match status {
            NotificationStatus::Scheduled => "scheduled",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    fn str_to_status(s: &str) -> NotificationStatus {
        match s {
            "sent" => NotificationStatus::Sent,
            "failed" => NotificationStatus::Failed,
            _ => NotificationStatus::Scheduled, // fallback
        }
    }

    fn str_to_role(s: &str) -> Option<UserRole> {
        match s {
            "STUDENT" => Some(UserRole::Student),
            "TEACHER" => Some(UserRole::Teacher),
            "GUARDIAN" => Some(UserRole::Guardian),
            "COORDINATOR" => Some(UserRole::Coordinator),
            "ADMIN" => Some(UserRole::Admin),
            _ => None,
        }
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> Notification {
        let kind: String = row.get("kind");
        let category: String = row.get("category");
        let priority: String = row.get("priority");
        let status: String = row.get("status");
        let roles: Vec<String> = row.get("recipient_roles");

        Notification {
            id: row.get("id"),
            title: row.get("title"),
            message: row.get("message"),
            kind: Self::str_to_kind(&kind),
            category: Self::str_to_category(&category),
            priority: Self::str_to_priority(&priority),
            status: Self::str_to_status(&status),
            recipient_roles: roles.iter().filter_map(|r| Self::str_to_role(r)).collect(),
            recipient_ids: row.get("recipient_ids"),
            recipient_total: row.get("recipient_total"),
            sent_count: row.get("sent_count"),
            scheduled_for: row.get("scheduled_for"),
            sent_at: row.get("sent_at"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<Uuid> {
        let roles: Vec<String> = notification
            .recipient_roles
            .iter()
            .map(|r| r.as_str().to_string())
            .collect();

        sqlx::query(
            "INSERT INTO notifications (id, title, message, kind, category, priority, status,
                 recipient_roles, recipient_ids, recipient_total, sent_count,
                 scheduled_for, sent_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(notification.id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(Self::kind_to_str(notification.kind))
        .bind(Self::category_to_str(notification.category))
        .bind(Self::priority_to_str(notification.priority))
        .bind(Self::status_to_str(notification.status))
        .bind(&roles)
        .bind(&notification.recipient_ids)
        .bind(notification.recipient_total)
        .bind(notification.sent_count)
        .bind(notification.scheduled_for)
        .bind(notification.sent_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(notification.id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
        recipient_total: i32,
        sent_count: i32,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE notifications
             SET status = 'sent', sent_at = $1, recipient_total = $2, sent_count = $3
             WHERE id = $4",
        )
        .bind(sent_at)
        .bind(recipient_total)
        .bind(sent_count)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE notifications SET status = 'failed' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<i64> {
        let result = sqlx::query(
            "DELETE FROM notifications
             WHERE status IN ('sent', 'failed') AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() as i64)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS}
             FROM notifications
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            NotificationKind::Info,
            NotificationKind::Warning,
            NotificationKind::Error,
            NotificationKind::Success,
        ] {
            let s = PgNotificationRepository::kind_to_str(kind);
            assert_eq!(PgNotificationRepository::str_to_kind(s), kind);
        }
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            NotificationCategory::Academic,
            NotificationCategory::System,
            NotificationCategory::Social,
            NotificationCategory::Administrative,
        ] {
            let s = PgNotificationRepository::category_to_str(category);
            assert_eq!(PgNotificationRepository::str_to_category(s), category);
        }
    }

    #[test]
    fn test_priority_round_trip() {
        for priority in [
            NotificationPriority::Low,
            NotificationPriority::Medium,
            NotificationPriority::High,
        ] {
            let s = PgNotificationRepository::priority_to_str(priority);
            assert_eq!(PgNotificationRepository::str_to_priority(s), priority);
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            NotificationStatus::Scheduled,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
        ] {
            let s = PgNotificationRepository::status_to_str(status);
            assert_eq!(PgNotificationRepository::str_to_status(s), status);
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(
            PgNotificationRepository::str_to_role("STUDENT"),
            Some(UserRole::Student)
        );
        assert_eq!(
            PgNotificationRepository::str_to_role("GUARDIAN"),
            Some(UserRole::Guardian)
        );
        assert_eq!(PgNotificationRepository::str_to_role("student"), None);
        assert_eq!(PgNotificationRepository::str_to_role(""), None);
    }

    #[test]
    fn test_role_round_trip() {
        for role in [
            UserRole::Student,
            UserRole::Teacher,
            UserRole::Guardian,
            UserRole::Coordinator,
            UserRole::Admin,
        ] {
            assert_eq!(PgNotificationRepository::str_to_role(role.as_str()), Some(role));
        }
    }
}
