//! Refresh token denylist.
//!
//! A refresh token is single use: the insert that records its `jti` is the
//! atomic check, and the loser of a race sees zero affected rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sneakpeak_core::UserId;

use super::{RepositoryError, TokenDenylist};

/// Repository over `storefront.revoked_token`.
#[derive(Clone)]
pub struct RevokedTokenRepository {
    pool: PgPool,
}

impl RevokedTokenRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenDenylist for RevokedTokenRepository {
    async fn revoke(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO storefront.revoked_token (jti, user_id, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(user_id.as_i32())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.revoked_token WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
