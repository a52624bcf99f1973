//! # portal-db
//!
//! PostgreSQL database layer for the portal backend.
//!
//! This crate provides:
//! - Connection pool management
//! - The job queue repository (insert, eligibility selection, state updates)
//! - The notification record repository
//! - Role-based recipient resolution
//!
//! ## Example
//!
//! ```rust,ignore
//! use portal_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/portal").await?;
//!     let pending = db.jobs.pending_count().await?;
//!     println!("{pending} jobs waiting");
//!     Ok(())
//! }
//! ```

pub mod jobs;
pub mod notifications;
pub mod pool;
pub mod recipients;

pub use jobs::PgJobRepository;
pub use notifications::PgNotificationRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use recipients::PgRecipientDirectory;

use portal_core::Result;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Job repository for background processing.
    pub jobs: PgJobRepository,
    /// Notification record repository.
    pub notifications: PgNotificationRepository,
    /// Role-based recipient directory.
    pub recipients: PgRecipientDirectory,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            jobs: PgJobRepository::new(pool.clone()),
            notifications: PgNotificationRepository::new(pool.clone()),
            recipients: PgRecipientDirectory::new(pool.clone()),
            pool,
        }
    }

    /// Connect to PostgreSQL with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Connect to PostgreSQL with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::new(pool))
    }
}
