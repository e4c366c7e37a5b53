//! User repository for database operations.
//!
//! Emails are stored already normalized, so every lookup is a plain equality
//! match on the unique `email` index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sneakpeak_core::{Email, UserId};

use super::{RepositoryError, UserStore, parse_role};
use crate::models::{AdminUserUpdate, NewUser, PageRequest, User};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, is_active, created_at, updated_at";

/// Raw `storefront.user` row.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            password_hash: row.password_hash,
            name: row.name,
            role: parse_role(&row.role)?,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO storefront.user (email, password_hash, name, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        User::try_from(row)
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.user SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_name(&self, id: UserId, name: &str) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE storefront.user SET name = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    async fn update_admin(
        &self,
        id: UserId,
        update: AdminUserUpdate,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE storefront.user
             SET role = COALESCE($2, role),
                 is_active = COALESCE($3, is_active),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.user")
            .fetch_one(&self.pool)
            .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, total))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
