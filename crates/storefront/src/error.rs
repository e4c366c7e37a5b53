//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response has the same JSON shape:
//!
//! ```json
//! { "error": "validation_error", "message": "Invalid request", "details": [...] }
//! ```
//!
//! Messages are fixed per code. Only validation errors carry `details`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::{AuthError, FieldError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request fields failed validation.
    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    /// Login failed for any reason.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// No usable access token on the request.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Refresh token missing, invalid, revoked, or its user is gone.
    #[error("Invalid token")]
    InvalidToken,

    /// Authenticated, but not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// Registration with an email that already has an account.
    #[error("Email already registered")]
    EmailTaken,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code and HTTP status.
    #[must_use]
    pub const fn code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            Self::EmailTaken => (StatusCode::BAD_REQUEST, "email_taken"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    /// Client-facing message. Never includes internal details.
    const fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid request",
            Self::InvalidCredentials => "Invalid email or password",
            Self::Unauthenticated => "Authentication required",
            Self::InvalidToken => "Invalid or expired token",
            Self::Forbidden => "Insufficient permissions",
            Self::EmailTaken => "An account with this email already exists",
            Self::NotFound(_) => "Not found",
            Self::RateLimited => "Too many requests, please try again later",
            Self::Database(_) | Self::Internal(_) => "Internal server error",
        }
    }

    /// Single-field validation error.
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(details) => Self::Validation(details),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::UserAlreadyExists => Self::EmailTaken,
            AuthError::UserNotFound => Self::Unauthenticated,
            AuthError::Repository(e) => Self::Database(e),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_owned()),
            AuthError::Token(e) => Self::Internal(format!("token signing failed: {e}")),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::field("body", rejection.body_text())
    }
}

/// Unwrap a JSON body, turning a rejection into a `validation_error`.
///
/// # Errors
///
/// Returns `AppError::Validation` if the body is missing or malformed.
pub fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value).map_err(AppError::from)
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [FieldError]>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, error) = self.code();
        let details = match &self {
            Self::Validation(details) => Some(details.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            error,
            message: self.public_message(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(AppError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AppError::EmailTaken), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_has_details() {
        let (status, json) = body_json(AppError::field("email", "email cannot be empty")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["details"][0]["field"], "email");
        assert_eq!(json["details"][0]["message"], "email cannot be empty");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, json) =
            body_json(AppError::Internal("connection refused on 10.0.0.3".to_owned())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], "Internal server error");
        assert!(json.get("details").is_none());
        assert!(!json.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            AppError::from(AuthError::UserAlreadyExists).code().1,
            "email_taken"
        );
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).code().1,
            "invalid_credentials"
        );
        assert_eq!(
            AppError::from(AuthError::PasswordHash).code().1,
            "internal_error"
        );
    }
}
