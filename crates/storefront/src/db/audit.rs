//! Audit log persistence.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{AuditSink, RepositoryError};
use crate::models::AuditEvent;

/// Repository over `storefront.audit_log`.
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for AuditRepository {
    async fn record(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO storefront.audit_log (user_id, event, path, ip, details, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.user_id.map(|id| id.as_i32()))
        .bind(event.event.as_str())
        .bind(&event.path)
        .bind(event.ip.map(|ip| ip.to_string()))
        .bind(&event.details)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
