//! Handlers for notification jobs: push dispatch and record cleanup.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use portal_core::{
    Error, JobKind, JobPayload, NotificationPushPayload, NotificationRepository, PushMessage,
    PushTransport, RecipientDirectory, Result,
};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Handler for [`JobKind::NotificationPush`]: resolves recipients, delivers
/// through the push transport, and updates the notification record.
pub struct PushDispatchHandler {
    notifications: Arc<dyn NotificationRepository>,
    directory: Arc<dyn RecipientDirectory>,
    transport: Arc<dyn PushTransport>,
}

impl PushDispatchHandler {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        directory: Arc<dyn RecipientDirectory>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        Self {
            notifications,
            directory,
            transport,
        }
    }

    /// Resolve the recipient spec to a deduplicated set of user ids:
    /// explicit ids unioned with role-based directory lookups.
    async fn resolve_recipients(&self, payload: &NotificationPushPayload) -> Result<Vec<Uuid>> {
        let mut ids = payload.recipients.user_ids.clone();
        let from_roles = self
            .directory
            .resolve_roles(&payload.recipients.roles)
            .await?;
        ids.extend(from_roles);
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn dispatch(&self, payload: &NotificationPushPayload) -> Result<(usize, usize)> {
        let id = payload.notification_id;
        let notification = self
            .notifications
            .get(id)
            .await?
            .ok_or(Error::NotificationNotFound(id))?;

        let recipients = self.resolve_recipients(payload).await?;

        let message = PushMessage {
            title: notification.title.clone(),
            body: notification.message.clone(),
            data: Some(json!({
                "notification_id": id,
                "category": notification.category,
                "kind": notification.kind,
            })),
        };

        let sent = self.transport.deliver(&recipients, &message).await?;

        self.notifications
            .mark_sent(id, Utc::now(), recipients.len() as i32, sent as i32)
            .await?;

        Ok((recipients.len(), sent))
    }
}

#[async_trait]
impl JobHandler for PushDispatchHandler {
    fn kind(&self) -> JobKind {
        JobKind::NotificationPush
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let payload = match ctx.payload() {
            JobPayload::NotificationPush(payload) => payload.clone(),
            other => {
                return JobResult::Failed(format!(
                    "unexpected payload kind for push dispatch: {}",
                    other.kind()
                ))
            }
        };

        match self.dispatch(&payload).await {
            Ok((total, sent)) => {
                info!(
                    subsystem = "jobs",
                    notification_id = %payload.notification_id,
                    recipients = total,
                    sent,
                    "Notification dispatched"
                );
                JobResult::Success
            }
            Err(e) => {
                // Mark the record failed before surfacing the error, so the
                // scheduler's retry/terminal bookkeeping applies on top of
                // the notification's own state.
                if let Err(mark_err) = self
                    .notifications
                    .mark_failed(payload.notification_id)
                    .await
                {
                    error!(
                        subsystem = "jobs",
                        notification_id = %payload.notification_id,
                        error = %mark_err,
                        "Failed to mark notification as failed"
                    );
                }
                JobResult::Failed(e.to_string())
            }
        }
    }
}

/// Handler for [`JobKind::NotificationCleanup`]: prunes old terminal-status
/// notification records.
pub struct NotificationCleanupHandler {
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationCleanupHandler {
    pub fn new(notifications: Arc<dyn NotificationRepository>) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl JobHandler for NotificationCleanupHandler {
    fn kind(&self) -> JobKind {
        JobKind::NotificationCleanup
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let payload = match ctx.payload() {
            JobPayload::NotificationCleanup(payload) => payload.clone(),
            other => {
                return JobResult::Failed(format!(
                    "unexpected payload kind for cleanup: {}",
                    other.kind()
                ))
            }
        };

        let cutoff = Utc::now() - Duration::days(payload.older_than_days);
        match self.notifications.delete_older_than(cutoff).await {
            Ok(removed) => {
                info!(
                    subsystem = "jobs",
                    removed,
                    older_than_days = payload.older_than_days,
                    "Old notifications cleaned up"
                );
                JobResult::Success
            }
            Err(e) => JobResult::Failed(e.to_string()),
        }
    }
}
