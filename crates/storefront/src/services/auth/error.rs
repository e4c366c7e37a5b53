//! Authentication error types.

use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;

/// A rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// One or more input fields failed validation.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Invalid credentials (wrong password, unknown or inactive user).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token signing error.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Shorthand for a single-field validation failure.
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}
