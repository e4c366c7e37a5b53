//! Authentication route handlers.
//!
//! JSON endpoints under `/auth`: login, token refresh, registration, the
//! caller's own account, and logout.
//!
//! Session cookies:
//!
//! | Cookie          | Path    | Lifetime   |
//! |-----------------|---------|------------|
//! | `access_token`  | `/`     | 15 minutes |
//! | `refresh_token` | `/auth` | 7 days     |
//!
//! Both are `HttpOnly` and `SameSite=Strict`, and `Secure` when the storefront
//! is served over HTTPS.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use sneakpeak_core::{Permission, Role};

use crate::error::{AppError, Result, clear_sentry_user, json_body, set_sentry_user};
use crate::middleware::{ClientContext, OptionalUser, RequireUser};
use crate::models::session::cookies;
use crate::models::{AuditEvent, AuditEventKind, PublicUser};
use crate::services::auth::{AuthError, FieldError, TokenKind, TokenPair};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Login request body. Missing fields deserialize as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Change password request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Update profile request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: String,
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub role: Role,
    pub permissions: &'static [Permission],
}

// =============================================================================
// Cookies
// =============================================================================

fn token_cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    max_age: time::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .build()
}

/// Set both session cookies from a freshly issued pair.
fn with_session_cookies(jar: CookieJar, pair: &TokenPair, secure: bool) -> CookieJar {
    jar.add(token_cookie(
        cookies::ACCESS_TOKEN,
        pair.access.clone(),
        "/",
        time::Duration::seconds(TokenKind::Access.ttl_secs()),
        secure,
    ))
    .add(token_cookie(
        cookies::REFRESH_TOKEN,
        pair.refresh.clone(),
        cookies::REFRESH_TOKEN_PATH,
        time::Duration::seconds(TokenKind::Refresh.ttl_secs()),
        secure,
    ))
}

/// Expire every session cookie, including the legacy one.
fn without_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    [
        (cookies::ACCESS_TOKEN, "/"),
        (cookies::REFRESH_TOKEN, cookies::REFRESH_TOKEN_PATH),
        (cookies::LEGACY_AUTH_TOKEN, "/"),
    ]
    .into_iter()
    .fold(jar, |jar, (name, path)| {
        jar.add(token_cookie(
            name,
            String::new(),
            path,
            time::Duration::ZERO,
            secure,
        ))
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Exchange email and password for a token pair.
///
/// Every credential failure returns the same `invalid_credentials` body.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    context: ClientContext,
    jar: CookieJar,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let req = json_body(body)?;

    let mut missing = Vec::new();
    if req.email.trim().is_empty() {
        missing.push(FieldError::new("email", "email is required"));
    }
    if req.password.is_empty() {
        missing.push(FieldError::new("password", "password is required"));
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    let user = match state.auth().login(&req.email, &req.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            state.audit().emit(
                AuditEvent::new(AuditEventKind::LoginFailed, context.path)
                    .ip(context.ip)
                    .details(json!({ "email": req.email.trim().to_lowercase() })),
            );
            return Err(AppError::InvalidCredentials);
        }
        Err(e) => return Err(e.into()),
    };

    let pair = state.tokens().issue_pair(&user.identity())?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User logged in");
    state.audit().emit(
        AuditEvent::new(AuditEventKind::LoginSucceeded, context.path)
            .user(user.id)
            .ip(context.ip),
    );

    let jar = with_session_cookies(jar, &pair, state.config().secure_cookies());
    Ok((
        jar,
        Json(LoginResponse {
            user: user.into(),
            access_token: pair.access,
        }),
    ))
}

/// Rotate the refresh token cookie into a new token pair.
///
/// The presented refresh token is revoked before the new pair is issued, so
/// each refresh token can be exchanged once.
#[tracing::instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    context: ClientContext,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>)> {
    let claims = jar
        .get(cookies::REFRESH_TOKEN)
        .and_then(|cookie| state.tokens().verify(cookie.value(), TokenKind::Refresh));

    let Some(claims) = claims else {
        state.audit().emit(
            AuditEvent::new(AuditEventKind::InvalidRefreshToken, context.path).ip(context.ip),
        );
        return Err(AppError::InvalidToken);
    };

    let first_use = state
        .revoked_tokens()
        .revoke(&claims.jti, claims.sub, claims.expires_at())
        .await?;
    if !first_use {
        tracing::warn!(user_id = %claims.sub, "Refresh token presented after rotation");
        state.audit().emit(
            AuditEvent::new(AuditEventKind::RefreshTokenReuse, context.path)
                .user(claims.sub)
                .ip(context.ip),
        );
        return Err(AppError::InvalidToken);
    }

    let Some(user) = state
        .users()
        .find_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
    else {
        state.audit().emit(
            AuditEvent::new(AuditEventKind::InvalidRefreshToken, context.path)
                .user(claims.sub)
                .ip(context.ip)
                .details(json!({ "reason": "user missing or inactive" })),
        );
        return Err(AppError::InvalidToken);
    };

    // The new pair carries the current role, not the one in the old token.
    let pair = state.tokens().issue_pair(&user.identity())?;
    state.audit().emit(
        AuditEvent::new(AuditEventKind::TokenRefreshed, context.path)
            .user(user.id)
            .ip(context.ip),
    );

    let jar = with_session_cookies(jar, &pair, state.config().secure_cookies());
    Ok((
        jar,
        Json(RefreshResponse {
            access_token: pair.access,
        }),
    ))
}

/// Create a customer account. Served on `/auth/register` and `/auth/signup`.
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    context: ClientContext,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let req = json_body(body)?;

    let user = state
        .auth()
        .register(&req.email, &req.password, &req.name)
        .await?;

    tracing::info!(user_id = %user.id, "User registered");
    state.audit().emit(
        AuditEvent::new(AuditEventKind::Registered, context.path)
            .user(user.id)
            .ip(context.ip),
    );

    Ok((StatusCode::CREATED, Json(UserResponse { user: user.into() })))
}

/// The caller's account, read fresh from the store.
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<UserResponse>> {
    let user = state.auth().get_user(current.id).await?;
    Ok(Json(UserResponse { user: user.into() }))
}

/// Clear session cookies and revoke the refresh token. Always succeeds.
#[tracing::instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    context: ClientContext,
    OptionalUser(current): OptionalUser,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let refresh_claims = jar
        .get(cookies::REFRESH_TOKEN)
        .and_then(|cookie| state.tokens().verify(cookie.value(), TokenKind::Refresh));

    if let Some(claims) = &refresh_claims
        && let Err(e) = state
            .revoked_tokens()
            .revoke(&claims.jti, claims.sub, claims.expires_at())
            .await
    {
        tracing::warn!(error = %e, "Failed to revoke refresh token on logout");
    }

    let user_id = current
        .map(|u| u.id)
        .or_else(|| refresh_claims.map(|c| c.sub));
    if let Some(user_id) = user_id {
        state.audit().emit(
            AuditEvent::new(AuditEventKind::LoggedOut, context.path)
                .user(user_id)
                .ip(context.ip),
        );
    }
    clear_sentry_user();

    (
        without_session_cookies(jar, state.config().secure_cookies()),
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
}

/// Change the caller's password.
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    context: ClientContext,
    body: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let req = json_body(body)?;

    state
        .auth()
        .change_password(current.id, &req.current_password, &req.new_password)
        .await?;

    state.audit().emit(
        AuditEvent::new(AuditEventKind::PasswordChanged, context.path)
            .user(current.id)
            .ip(context.ip),
    );

    Ok(Json(MessageResponse {
        message: "Password changed successfully",
    }))
}

/// Change the caller's display name.
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    context: ClientContext,
    body: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>> {
    let req = json_body(body)?;

    let user = state.auth().update_profile(current.id, &req.name).await?;
    state.audit().emit(
        AuditEvent::new(AuditEventKind::ProfileUpdated, context.path)
            .user(current.id)
            .ip(context.ip),
    );

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user: user.into(),
    }))
}

/// Permissions granted by the caller's role.
pub async fn permissions(RequireUser(current): RequireUser) -> Json<PermissionsResponse> {
    Json(PermissionsResponse {
        role: current.role,
        permissions: current.role.permissions(),
    })
}
