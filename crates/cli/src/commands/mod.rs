//! Subcommand implementations.

pub mod migrate;
pub mod tokens;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use sneakpeak_storefront::db::{self, RepositoryError};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Input rejected by account validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No user has this email.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    /// A user already has this email.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// Reading the password from stdin failed.
    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),

    /// Password hashing failed.
    #[error("Password hashing failed")]
    PasswordHash,
}

/// Connect to the storefront database.
///
/// Reads `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CliError> {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&SecretString::from(url)).await?)
}
