//! Recipient directory implementation over the portal `users` table.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use portal_core::{Error, RecipientDirectory, Result, UserRole};

/// PostgreSQL implementation of [`RecipientDirectory`].
///
/// Resolves role tags against the portal's `users` table. Only active
/// accounts are returned; deactivated users never receive pushes.
pub struct PgRecipientDirectory {
    pool: Pool<Postgres>,
}

impl PgRecipientDirectory {
    /// Create a new PgRecipientDirectory with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientDirectory for PgRecipientDirectory {
    async fn resolve_roles(&self, roles: &[UserRole]) -> Result<Vec<Uuid>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let role_strings: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();

        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM users WHERE role = ANY($1) AND active",
        )
        .bind(&role_strings)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ids)
    }
}
