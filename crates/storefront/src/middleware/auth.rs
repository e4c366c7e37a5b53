//! Session resolution, authorization gate and auth extractors.
//!
//! Identity is rebuilt from the access token on every request. Token sources
//! are tried in a fixed order: `Authorization: Bearer`, then the
//! `access_token` cookie, then the legacy `auth-token` cookie. The first
//! source present is the one verified; a bad header is not rescued by a
//! cookie.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn dashboard(RequireStaff(user): RequireStaff) -> impl IntoResponse {
//!     format!("Hello, {}!", user.email)
//! }
//!
//! async fn edit_user(gate: Gate) -> Result<Json<()>, AppError> {
//!     let admin = gate.require_permission(Permission::UsersUpdate).await?;
//!     // ...
//! }
//! ```

use std::net::IpAddr;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use sneakpeak_core::{Permission, Role};

use super::client_ip::ClientContext;
use crate::db::{PermissionLookup, RepositoryError};
use crate::error::AppError;
use crate::models::session::cookies;
use crate::models::{AuditEvent, AuditEventKind, CurrentUser};
use crate::services::auth::{TokenKind, TokenService};
use crate::state::AppState;

// =============================================================================
// Session Resolver
// =============================================================================

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme name is case-insensitive (RFC 9110 §11.1).
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let (scheme, token) = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .trim_start()
        .split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Resolve the caller's identity from request headers.
///
/// Returns `None` when no token is present or the first present token does
/// not verify as an access token.
#[must_use]
pub fn resolve(tokens: &TokenService, headers: &HeaderMap) -> Option<CurrentUser> {
    let jar = CookieJar::from_headers(headers);

    let token = bearer_token(headers).map(str::to_owned).or_else(|| {
        [cookies::ACCESS_TOKEN, cookies::LEGACY_AUTH_TOKEN]
            .into_iter()
            .find_map(|name| jar.get(name).map(|c| c.value().to_owned()))
    })?;

    tokens
        .verify(&token, TokenKind::Access)
        .map(|claims| claims.current_user())
}

// =============================================================================
// Authorization Gate
// =============================================================================

/// What a route demands of its caller. Both parts must hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct Requirement<'a> {
    /// Allowed roles; `None` admits any authenticated user.
    pub roles: Option<&'a [Role]>,
    /// Permission the caller must hold.
    pub permission: Option<Permission>,
}

impl<'a> Requirement<'a> {
    /// Any authenticated user.
    pub const AUTHENTICATED: Self = Self {
        roles: None,
        permission: None,
    };

    #[must_use]
    pub const fn roles(roles: &'a [Role]) -> Self {
        Self {
            roles: Some(roles),
            permission: None,
        }
    }

    #[must_use]
    pub const fn permission(permission: Permission) -> Self {
        Self {
            roles: None,
            permission: Some(permission),
        }
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No authenticated user.
    Unauthenticated,
    /// Authenticated, but the role or permission does not match.
    Forbidden,
}

/// Outcome of [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Decide whether `user` meets `requirement`.
///
/// A permission is held if the user's role grants it by default or an
/// explicit grant exists for the user.
///
/// # Errors
///
/// Returns `RepositoryError` if the explicit grant lookup fails.
pub async fn authorize(
    user: Option<&CurrentUser>,
    requirement: Requirement<'_>,
    permissions: &dyn PermissionLookup,
) -> Result<Decision, RepositoryError> {
    let Some(user) = user else {
        return Ok(Decision::Deny(DenyReason::Unauthenticated));
    };

    if let Some(roles) = requirement.roles
        && !roles.contains(&user.role)
    {
        return Ok(Decision::Deny(DenyReason::Forbidden));
    }

    if let Some(permission) = requirement.permission
        && !user.role.grants(permission)
        && !permissions.has_permission(user.id, permission).await?
    {
        return Ok(Decision::Deny(DenyReason::Forbidden));
    }

    Ok(Decision::Allow)
}

/// Per-request gate: the resolved caller plus what is needed to audit denials.
pub struct Gate {
    state: AppState,
    user: Option<CurrentUser>,
    context: ClientContext,
}

impl Gate {
    /// The resolved caller, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// Client IP used in audit records.
    #[must_use]
    pub const fn ip(&self) -> Option<IpAddr> {
        self.context.ip
    }

    /// Enforce `requirement`, auditing and rejecting on deny.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthenticated` or `AppError::Forbidden` on deny, or
    /// `AppError::Database` if the permission lookup fails.
    pub async fn require(&self, requirement: Requirement<'_>) -> Result<CurrentUser, AppError> {
        let decision =
            authorize(self.user.as_ref(), requirement, self.state.permissions()).await?;

        match (decision, &self.user) {
            (Decision::Allow, Some(user)) => Ok(user.clone()),
            (Decision::Allow, None) => Err(AppError::Unauthenticated),
            (Decision::Deny(reason), _) => {
                self.audit_denial(reason, requirement);
                Err(match reason {
                    DenyReason::Unauthenticated => AppError::Unauthenticated,
                    DenyReason::Forbidden => AppError::Forbidden,
                })
            }
        }
    }

    /// Require a named permission.
    ///
    /// # Errors
    ///
    /// See [`Gate::require`].
    pub async fn require_permission(
        &self,
        permission: Permission,
    ) -> Result<CurrentUser, AppError> {
        self.require(Requirement::permission(permission)).await
    }

    fn audit_denial(&self, reason: DenyReason, requirement: Requirement<'_>) {
        let kind = match reason {
            DenyReason::Unauthenticated => AuditEventKind::Unauthenticated,
            DenyReason::Forbidden => AuditEventKind::Forbidden,
        };

        let mut event = AuditEvent::new(kind, self.context.path.clone())
            .ip(self.context.ip)
            .details(json!({
                "requiredRoles": requirement.roles,
                "requiredPermission": requirement.permission,
                "role": self.user.as_ref().map(|u| u.role),
            }));
        if let Some(user) = &self.user {
            event = event.user(user.id);
        }

        self.state.audit().emit(event);
    }
}

impl FromRequestParts<AppState> for Gate {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(context) = ClientContext::from_request_parts(parts, state).await;

        Ok(Self {
            user: resolve(state.tokens(), &parts.headers),
            context,
            state: state.clone(),
        })
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Extractor that requires an authenticated user.
///
/// Rejects with `401 unauthenticated`.
pub struct RequireUser(pub CurrentUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(gate) = Gate::from_request_parts(parts, state).await;
        gate.require(Requirement::AUTHENTICATED).await.map(Self)
    }
}

/// Extractor that optionally gets the current user. Never rejects.
pub struct OptionalUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(state.tokens(), &parts.headers)))
    }
}

/// Extractor that requires the `admin` role.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(gate) = Gate::from_request_parts(parts, state).await;
        gate.require(Requirement::roles(&[Role::Admin]))
            .await
            .map(Self)
    }
}

/// Extractor that requires a back-office role (`seller` or `admin`).
pub struct RequireStaff(pub CurrentUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Ok(gate) = Gate::from_request_parts(parts, state).await;
        gate.require(Requirement::roles(&[Role::Seller, Role::Admin]))
            .await
            .map(Self)
    }
}
