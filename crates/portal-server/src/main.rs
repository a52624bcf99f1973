//! portal-server — worker daemon for the portal backend.
//!
//! Boots the job scheduler with the notification dispatch handlers and runs
//! until interrupted. The HTTP admin API lives in a separate service; this
//! process owns the single scheduler instance allowed per job table.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal_core::defaults;
use portal_db::Database;
use portal_jobs::{JobScheduler, NotificationService, SchedulerConfig};
use portal_push::GatewayPushClient;

/// Initialize tracing from the environment.
///
/// Env vars:
///   LOG_FORMAT - "text" (default) or "json"
///   RUST_LOG   - standard env filter (default: "portal_server=debug,info")
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portal_server=debug,info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!(log_format = %log_format, "Logging initialized");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; real env vars win.
    dotenvy::dotenv().ok();

    init_tracing();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/portal".to_string());

    let db = Database::connect(&database_url)
        .await
        .context("failed to connect to database")?;

    let push = GatewayPushClient::from_env().context("failed to build push gateway client")?;

    let scheduler = Arc::new(JobScheduler::new(
        Arc::new(db.jobs),
        SchedulerConfig::from_env(),
    ));

    // Registers the push-dispatch and cleanup handlers before the first cycle.
    let notifications = NotificationService::new(
        scheduler.clone(),
        Arc::new(db.notifications),
        Arc::new(db.recipients),
        Arc::new(push),
    )
    .await;

    // Kick off a retention sweep on each boot.
    notifications
        .schedule_cleanup(defaults::NOTIFICATION_RETENTION_DAYS)
        .await
        .context("failed to schedule notification cleanup")?;

    let handle = scheduler.clone().start();
    info!(subsystem = "server", "portal-server running, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!(subsystem = "server", "Shutting down, draining in-flight jobs");
    handle.shutdown().await;

    if let Ok(stats) = scheduler.stats().await {
        info!(
            subsystem = "server",
            pending = stats.pending,
            delayed = stats.delayed,
            completed = stats.completed,
            failed = stats.failed,
            "Final queue state"
        );
    }

    Ok(())
}
