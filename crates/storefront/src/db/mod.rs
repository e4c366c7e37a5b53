//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `user` - Accounts with argon2id password hashes, role and activity flag
//! - `user_permission` - Explicit permission grants on top of role defaults
//! - `revoked_token` - Refresh token IDs that may no longer be exchanged
//! - `audit_log` - Security audit trail
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sneakpeak-cli -- migrate
//! ```
//!
//! Handlers never touch the pool directly. They go through the store traits
//! below so the router can run against [`memory::MemoryStore`] in tests.

pub mod audit;
pub mod memory;
pub mod permissions;
pub mod tokens;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use sneakpeak_core::{Email, Permission, Role, UserId};

use crate::models::{AdminUserUpdate, AuditEvent, NewUser, PageRequest, User};

pub use audit::AuditRepository;
pub use memory::MemoryStore;
pub use permissions::PermissionRepository;
pub use tokens::RevokedTokenRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by normalized email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    async fn update_name(&self, id: UserId, name: &str) -> Result<User, RepositoryError>;

    /// Apply an administrator's change to role and/or activity flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn update_admin(
        &self,
        id: UserId,
        update: AdminUserUpdate,
    ) -> Result<User, RepositoryError>;

    /// One page of users, newest first, plus the total count.
    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64), RepositoryError>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Explicit permission grants keyed by user.
#[async_trait]
pub trait PermissionLookup: Send + Sync {
    async fn has_permission(
        &self,
        user_id: UserId,
        permission: Permission,
    ) -> Result<bool, RepositoryError>;

    /// Grant a permission. Granting twice is a no-op.
    async fn grant(&self, user_id: UserId, permission: Permission) -> Result<(), RepositoryError>;
}

/// Denylist of refresh token IDs.
#[async_trait]
pub trait TokenDenylist: Send + Sync {
    /// Mark `jti` as used.
    ///
    /// Returns `true` if this call revoked it and `false` if it was already
    /// revoked. Concurrent callers with the same `jti` see exactly one `true`.
    async fn revoke(
        &self,
        jti: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Drop entries whose token would have expired anyway.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Destination of security audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), RepositoryError>;
}

/// Store handles shared through `AppState`.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub permissions: Arc<dyn PermissionLookup>,
    pub tokens: Arc<dyn TokenDenylist>,
    pub audit: Arc<dyn AuditSink>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            permissions: Arc::new(PermissionRepository::new(pool.clone())),
            tokens: Arc::new(RevokedTokenRepository::new(pool.clone())),
            audit: Arc::new(AuditRepository::new(pool.clone())),
        }
    }

    /// All four stores backed by the same in-memory store.
    #[must_use]
    pub fn memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            permissions: store.clone(),
            tokens: store.clone(),
            audit: store.clone(),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Parse a role column, treating unknown values as corruption.
pub(crate) fn parse_role(raw: &str) -> Result<Role, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid role in database: {e}")))
}
