//! Explicit permission grants.

use async_trait::async_trait;
use sqlx::PgPool;

use sneakpeak_core::{Permission, UserId};

use super::{PermissionLookup, RepositoryError};

/// Repository over `storefront.user_permission`.
#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionLookup for PermissionRepository {
    async fn has_permission(
        &self,
        user_id: UserId,
        permission: Permission,
    ) -> Result<bool, RepositoryError> {
        let granted: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM storefront.user_permission
                 WHERE user_id = $1 AND permission = $2
             )",
        )
        .bind(user_id.as_i32())
        .bind(permission.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(granted)
    }

    async fn grant(&self, user_id: UserId, permission: Permission) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO storefront.user_permission (user_id, permission)
             VALUES ($1, $2)
             ON CONFLICT (user_id, permission) DO NOTHING",
        )
        .bind(user_id.as_i32())
        .bind(permission.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }
}
