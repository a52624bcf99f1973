//! Notification dispatch: translates a "create notification" request into a
//! persisted record plus exactly one scheduler job.
//!
//! Each notification drives two loosely-coupled state machines: the record's
//! own `scheduled → sent | failed`, and the underlying job's
//! `pending/delayed → processing → completed | failed`. They are joined only
//! by the notification id carried in the job payload.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use portal_core::{
    CreateNotificationRequest, EnqueueOptions, JobKind, JobPayload, Notification,
    NotificationCleanupPayload, NotificationPushPayload, NotificationRepository,
    NotificationStatus, PushTransport, RecipientDirectory, Result,
};

use crate::notification_handler::{NotificationCleanupHandler, PushDispatchHandler};
use crate::scheduler::JobScheduler;

/// Creates notification records and enqueues their delivery jobs.
///
/// Construction registers the push-dispatch and cleanup handlers on the
/// scheduler, so a service instance must exist before the scheduler is
/// started.
pub struct NotificationService {
    scheduler: Arc<JobScheduler>,
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    /// Create the service and register its job handlers.
    pub async fn new(
        scheduler: Arc<JobScheduler>,
        notifications: Arc<dyn NotificationRepository>,
        directory: Arc<dyn RecipientDirectory>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        scheduler
            .register_handler(PushDispatchHandler::new(
                notifications.clone(),
                directory,
                transport,
            ))
            .await;
        scheduler
            .register_handler(NotificationCleanupHandler::new(notifications.clone()))
            .await;

        Self {
            scheduler,
            notifications,
        }
    }

    /// Create a notification record and enqueue exactly one delivery job.
    ///
    /// When `scheduled_for` lies in the future the job is delayed until that
    /// instant; otherwise delivery is eligible on the next poll cycle.
    /// Returns the notification id (not the job id): producers observe
    /// outcomes through record state.
    pub async fn create_notification(&self, req: CreateNotificationRequest) -> Result<Uuid> {
        let now = Utc::now();
        let id = Uuid::now_v7();

        let notification = Notification {
            id,
            title: req.title,
            message: req.message,
            kind: req.kind,
            category: req.category,
            priority: req.priority,
            status: NotificationStatus::Scheduled,
            recipient_roles: req.recipients.roles.clone(),
            recipient_ids: req.recipients.user_ids.clone(),
            recipient_total: 0,
            sent_count: 0,
            scheduled_for: req.scheduled_for,
            sent_at: None,
            created_at: now,
        };
        self.notifications.insert(&notification).await?;

        let delay_ms = req
            .scheduled_for
            .map(|at| (at - now).num_milliseconds().max(0))
            .unwrap_or(0);

        let job_id = self
            .scheduler
            .enqueue(
                JobPayload::NotificationPush(NotificationPushPayload {
                    notification_id: id,
                    recipients: req.recipients,
                }),
                EnqueueOptions::default()
                    .priority(req.priority.job_priority())
                    .delay_ms(delay_ms),
            )
            .await?;

        info!(
            subsystem = "jobs",
            notification_id = %id,
            job_id = %job_id,
            delay_ms,
            "Notification queued for dispatch"
        );
        Ok(id)
    }

    /// Enqueue a cleanup job that prunes terminal-status notifications older
    /// than `older_than_days`.
    pub async fn schedule_cleanup(&self, older_than_days: i64) -> Result<Uuid> {
        self.scheduler
            .enqueue(
                JobPayload::NotificationCleanup(NotificationCleanupPayload { older_than_days }),
                EnqueueOptions::default().priority(JobKind::NotificationCleanup.default_priority()),
            )
            .await
    }
}
