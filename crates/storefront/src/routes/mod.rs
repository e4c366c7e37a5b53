//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                - Liveness
//! GET   /health/ready          - Readiness (store ping)
//!
//! # Auth
//! POST  /auth/login            - Email + password login, sets cookies (rate limited)
//! POST  /auth/refresh          - Rotate refresh token
//! POST  /auth/register         - Create customer account (rate limited)
//! POST  /auth/signup           - Alias of /auth/register (rate limited)
//! GET   /auth/me               - Current user
//! POST  /auth/logout           - Clear cookies, revoke refresh token
//! POST  /auth/change-password  - Change own password (auth)
//! POST  /auth/update-profile   - Change own display name (auth)
//! GET   /auth/permissions      - Own role permissions (auth)
//!
//! # Admin
//! GET   /admin/users           - Paginated user listing (admin)
//! PATCH /admin/users/{id}      - Change role / activity flag (users:update)
//! ```

pub mod admin;
pub mod auth;
pub mod health;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::middleware::{auth_rate_limiter, rate_limited_json};
use crate::state::AppState;

/// Credential endpoints: the brute-force targets.
pub fn credential_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/signup", post(auth::register))
}

/// Session endpoints, called on every page load by signed-in clients.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/change-password", post(auth::change_password))
        .route("/auth/update-profile", post(auth::update_profile))
        .route("/auth/permissions", get(auth::permissions))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    credential_routes().merge(session_routes())
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", patch(admin::update_user))
}

/// Create the health routes router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Create all routes for the storefront, without rate limiting.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(admin_routes())
}

/// Create all routes with the per-IP limiter on login and registration.
///
/// Session endpoints stay unlimited so a signed-in client can call
/// `/auth/me` as often as it renders a page.
///
/// Returns `None` only if the limiter configuration is rejected.
pub fn rate_limited_routes() -> Option<Router<AppState>> {
    let limited_credentials = credential_routes()
        .layer(auth_rate_limiter()?)
        .layer(axum::middleware::map_response(rate_limited_json));

    Some(
        Router::new()
            .merge(health_routes())
            .merge(limited_credentials)
            .merge(session_routes())
            .merge(admin_routes()),
    )
}
