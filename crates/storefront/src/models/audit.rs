//! Security audit records.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use sneakpeak_core::UserId;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    LoginSucceeded,
    LoginFailed,
    Registered,
    TokenRefreshed,
    InvalidRefreshToken,
    RefreshTokenReuse,
    LoggedOut,
    PasswordChanged,
    ProfileUpdated,
    UserUpdated,
    #[serde(rename = "unauthenticated_access")]
    Unauthenticated,
    #[serde(rename = "forbidden_access")]
    Forbidden,
}

impl AuditEventKind {
    /// Stable string stored in the `event` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::Registered => "registered",
            Self::TokenRefreshed => "token_refreshed",
            Self::InvalidRefreshToken => "invalid_refresh_token",
            Self::RefreshTokenReuse => "refresh_token_reuse",
            Self::LoggedOut => "logged_out",
            Self::PasswordChanged => "password_changed",
            Self::ProfileUpdated => "profile_updated",
            Self::UserUpdated => "user_updated",
            Self::Unauthenticated => "unauthenticated_access",
            Self::Forbidden => "forbidden_access",
        }
    }
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the security audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Acting user, when known.
    pub user_id: Option<UserId>,
    pub event: AuditEventKind,
    /// Request path the event happened on.
    pub path: String,
    pub ip: Option<IpAddr>,
    /// Event-specific context (email attempted, role required, ...).
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    #[must_use]
    pub fn new(event: AuditEventKind, path: impl Into<String>) -> Self {
        Self {
            user_id: None,
            event,
            path: path.into(),
            ip: None,
            details: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn ip(mut self, ip: Option<IpAddr>) -> Self {
        self.ip = ip;
        self
    }

    #[must_use]
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}
