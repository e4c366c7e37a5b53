//! Router-level tests for the auth and admin endpoints.
//!
//! Each test builds the full router over an in-memory store and drives it
//! with `oneshot`, so no database or listening socket is needed.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use argon2::Params;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use sneakpeak_core::{Email, Permission, Role, UserId};
use sneakpeak_storefront::config::StorefrontConfig;
use sneakpeak_storefront::db::{MemoryStore, PermissionLookup, Stores, UserStore};
use sneakpeak_storefront::models::{AdminUserUpdate, AuditEventKind, CurrentUser, NewUser};
use sneakpeak_storefront::routes;
use sneakpeak_storefront::services::auth::{Hasher, TokenKind, TokenService};
use sneakpeak_storefront::state::AppState;

const SECRET: &str = "kB7#qL2!vN9@xR4$wT6^zP1&mJ8*cF3%";
const PASSWORD: &str = "air-max-1987";

// =============================================================================
// Harness
// =============================================================================

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    hasher: Hasher,
}

fn config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: Url::parse("http://localhost:3000").unwrap(),
        jwt_secret: SecretString::from(SECRET),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

fn hasher() -> Hasher {
    Hasher::with_params(Params::new(8, 1, 1, None).unwrap()).unwrap()
}

impl TestApp {
    fn new() -> Self {
        Self::with_router(routes::routes())
    }

    fn with_router(routes: Router<AppState>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let hasher = hasher();
        let state = AppState::new(config(), Stores::memory(&store), hasher.clone());
        Self {
            router: routes.with_state(state),
            store,
            hasher,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn seed(&self, email: &str, role: Role) -> UserId {
        self.store
            .create(NewUser {
                email: Email::parse(email).unwrap(),
                password_hash: self.hasher.hash(PASSWORD).unwrap(),
                name: "Seeded".to_owned(),
                role,
            })
            .await
            .unwrap()
            .id
    }

    /// Log in and return the access token and refresh cookie value.
    async fn login(&self, email: &str) -> (String, String) {
        let response = self
            .send(post_json(
                "/auth/login",
                &json!({ "email": email, "password": PASSWORD }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let refresh = cookie_value(&response, "refresh_token").unwrap();
        let body = json_body(response).await;
        (body["accessToken"].as_str().unwrap().to_owned(), refresh)
    }

    /// Let spawned audit writes run, then check for `kind`.
    async fn saw_audit(&self, kind: AuditEventKind) -> bool {
        for _ in 0..50 {
            if self.store.audit_events().iter().any(|e| e.event == kind) {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

fn with_cookie(mut request: Request<Body>, cookie: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_owned())
        .collect()
}

fn set_cookie(response: &Response, name: &str) -> Option<String> {
    set_cookie_headers(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{name}=")))
}

fn cookie_value(response: &Response, name: &str) -> Option<String> {
    let raw = set_cookie(response, name)?;
    let pair = raw.split(';').next()?;
    pair.split_once('=').map(|(_, v)| v.to_owned())
}

fn tokens() -> TokenService {
    TokenService::new(&SecretString::from(SECRET))
}

// =============================================================================
// Registration and login
// =============================================================================

#[tokio::test]
async fn register_then_login_issues_tokens_for_that_user() {
    let app = TestApp::new();

    let response = app
        .send(post_json(
            "/auth/register",
            &json!({ "email": "Fresh@SneakPeak.shop", "password": PASSWORD, "name": " Fresh " }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], "fresh@sneakpeak.shop");
    assert_eq!(body["user"]["name"], "Fresh");
    assert_eq!(body["user"]["role"], "customer");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(app.saw_audit(AuditEventKind::Registered).await);

    let response = app
        .send(post_json(
            "/auth/login",
            &json!({ "email": "fresh@sneakpeak.shop", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let refresh_cookie = set_cookie(&response, "refresh_token").unwrap();
    assert!(refresh_cookie.contains("HttpOnly"));
    assert!(refresh_cookie.contains("SameSite=Strict"));
    assert!(refresh_cookie.contains("Path=/auth"));
    assert!(refresh_cookie.contains("Max-Age=604800"));
    assert!(!refresh_cookie.contains("Secure"));

    let access_cookie = set_cookie(&response, "access_token").unwrap();
    assert!(access_cookie.contains("HttpOnly"));
    assert!(access_cookie.contains("Path=/;") || access_cookie.ends_with("Path=/"));
    assert!(access_cookie.contains("Max-Age=900"));

    let body = json_body(response).await;
    let claims = tokens()
        .verify(body["accessToken"].as_str().unwrap(), TokenKind::Access)
        .unwrap();
    assert_eq!(
        i64::from(claims.sub.as_i32()),
        body["user"]["id"].as_i64().unwrap()
    );
    assert_eq!(claims.email.as_str(), "fresh@sneakpeak.shop");
    assert_eq!(claims.role, Role::Customer);
    assert!(app.saw_audit(AuditEventKind::LoginSucceeded).await);
}

#[tokio::test]
async fn signup_is_an_alias_of_register() {
    let app = TestApp::new();
    let response = app
        .send(post_json(
            "/auth/signup",
            &json!({ "email": "alias@sp.shop", "password": PASSWORD, "name": "Alias" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn register_reports_every_invalid_field() {
    let app = TestApp::new();
    let response = app
        .send(post_json(
            "/auth/register",
            &json!({ "email": "not-an-email", "password": "short", "name": "  " }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<_> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(fields, ["email", "password", "name"]);
}

#[tokio::test]
async fn duplicate_registration_is_email_taken() {
    let app = TestApp::new();
    app.seed("taken@sp.shop", Role::Customer).await;

    let response = app
        .send(post_json(
            "/auth/register",
            &json!({ "email": "TAKEN@sp.shop", "password": PASSWORD, "name": "Again" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "email_taken");
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn concurrent_duplicate_registrations_create_one_user() {
    let app = TestApp::new();
    let body = json!({ "email": "race@sp.shop", "password": PASSWORD, "name": "Racer" });

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let router = app.router.clone();
            let request = post_json("/auth/register", &body);
            tokio::spawn(async move { router.oneshot(request).await.unwrap().status() })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            status => assert_eq!(status, StatusCode::BAD_REQUEST),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let app = TestApp::new();
    app.seed("known@sp.shop", Role::Customer).await;

    let wrong_password = app
        .send(post_json(
            "/auth/login",
            &json!({ "email": "known@sp.shop", "password": "not-the-password" }),
        ))
        .await;
    let unknown_email = app
        .send(post_json(
            "/auth/login",
            &json!({ "email": "stranger@sp.shop", "password": PASSWORD }),
        ))
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), wrong_password.status());
    assert!(set_cookie_headers(&wrong_password).is_empty());

    let a = body_bytes(wrong_password).await;
    let b = body_bytes(unknown_email).await;
    assert_eq!(a, b);
    let body: Value = serde_json::from_slice(&a).unwrap();
    assert_eq!(body["error"], "invalid_credentials");
    assert!(app.saw_audit(AuditEventKind::LoginFailed).await);
}

#[tokio::test]
async fn login_email_is_case_insensitive() {
    let app = TestApp::new();
    app.seed("mixed@sp.shop", Role::Customer).await;
    let (token, _) = app.login("  MiXeD@SP.shop ").await;
    assert!(tokens().verify(&token, TokenKind::Access).is_some());
}

#[tokio::test]
async fn login_with_missing_fields_is_validation_error() {
    let app = TestApp::new();

    let response = app
        .send(post_json("/auth/login", &json!({ "email": "a@sp.shop" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "password");

    let response = app.send(empty_post("/auth/login")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "validation_error");
}

#[tokio::test]
async fn inactive_user_cannot_log_in() {
    let app = TestApp::new();
    let id = app.seed("benched@sp.shop", Role::Customer).await;
    app.store
        .update_admin(
            id,
            AdminUserUpdate {
                role: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

    let response = app
        .send(post_json(
            "/auth/login",
            &json!({ "email": "benched@sp.shop", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "invalid_credentials");
}

// =============================================================================
// Session resolution
// =============================================================================

#[tokio::test]
async fn me_resolves_bearer_and_cookie() {
    let app = TestApp::new();
    app.seed("me@sp.shop", Role::Seller).await;
    let (token, _) = app.login("me@sp.shop").await;

    let response = app.send(with_bearer(get("/auth/me"), &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], "me@sp.shop");
    assert_eq!(body["user"]["role"], "seller");

    let response = app
        .send(with_cookie(get("/auth/me"), &format!("access_token={token}")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(with_cookie(get("/auth/me"), &format!("auth-token={token}")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn me_without_token_is_unauthenticated() {
    let app = TestApp::new();

    let response = app.send(get("/auth/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "unauthenticated");

    let response = app.send(with_bearer(get("/auth/me"), "garbage")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let app = TestApp::new();
    app.seed("kinds@sp.shop", Role::Customer).await;
    let (_, refresh) = app.login("kinds@sp.shop").await;

    let response = app.send(with_bearer(get("/auth/me"), &refresh)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Refresh rotation
// =============================================================================

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = TestApp::new();
    app.seed("rotate@sp.shop", Role::Customer).await;
    let (access, refresh) = app.login("rotate@sp.shop").await;

    let response = app
        .send(with_cookie(
            empty_post("/auth/refresh"),
            &format!("refresh_token={refresh}"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let new_refresh = cookie_value(&response, "refresh_token").unwrap();
    let new_access_cookie = cookie_value(&response, "access_token").unwrap();
    assert_ne!(new_refresh, refresh);

    let body = json_body(response).await;
    let new_access = body["accessToken"].as_str().unwrap();
    assert_ne!(new_access, access);
    assert_eq!(new_access, new_access_cookie);
    assert!(app.saw_audit(AuditEventKind::TokenRefreshed).await);

    // The rotated-away token is single use.
    let replay = app
        .send(with_cookie(
            empty_post("/auth/refresh"),
            &format!("refresh_token={refresh}"),
        ))
        .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(replay).await["error"], "invalid_token");
    assert!(app.saw_audit(AuditEventKind::RefreshTokenReuse).await);

    // The replacement still works.
    let response = app
        .send(with_cookie(
            empty_post("/auth/refresh"),
            &format!("refresh_token={new_refresh}"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_without_cookie_is_invalid_token() {
    let app = TestApp::new();

    let response = app.send(empty_post("/auth/refresh")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "invalid_token");
    assert!(app.saw_audit(AuditEventKind::InvalidRefreshToken).await);

    let response = app
        .send(with_cookie(empty_post("/auth/refresh"), "refresh_token=forged"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_picks_up_role_changes_and_deactivation() {
    let app = TestApp::new();
    let id = app.seed("promoted@sp.shop", Role::Customer).await;
    let (_, refresh) = app.login("promoted@sp.shop").await;

    app.store
        .update_admin(
            id,
            AdminUserUpdate {
                role: Some(Role::Seller),
                is_active: None,
            },
        )
        .await
        .unwrap();

    let response = app
        .send(with_cookie(
            empty_post("/auth/refresh"),
            &format!("refresh_token={refresh}"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let refresh = cookie_value(&response, "refresh_token").unwrap();
    let body = json_body(response).await;
    let claims = tokens()
        .verify(body["accessToken"].as_str().unwrap(), TokenKind::Access)
        .unwrap();
    assert_eq!(claims.role, Role::Seller);

    app.store
        .update_admin(
            id,
            AdminUserUpdate {
                role: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

    let response = app
        .send(with_cookie(
            empty_post("/auth/refresh"),
            &format!("refresh_token={refresh}"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_for_deleted_user_is_invalid_token() {
    let app = TestApp::new();
    let ghost = CurrentUser {
        id: UserId::new(999),
        email: Email::parse("ghost@sp.shop").unwrap(),
        role: Role::Customer,
    };
    let refresh = tokens().issue(&ghost, TokenKind::Refresh).unwrap();

    let response = app
        .send(with_cookie(
            empty_post("/auth/refresh"),
            &format!("refresh_token={refresh}"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "invalid_token");
    assert!(app.saw_audit(AuditEventKind::InvalidRefreshToken).await);

    // The jti is burned even though no user row exists.
    let replay = app
        .send(with_cookie(
            empty_post("/auth/refresh"),
            &format!("refresh_token={refresh}"),
        ))
        .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert!(app.saw_audit(AuditEventKind::RefreshTokenReuse).await);
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn logout_clears_cookies_and_revokes_refresh_token() {
    let app = TestApp::new();
    app.seed("bye@sp.shop", Role::Customer).await;
    let (access, refresh) = app.login("bye@sp.shop").await;

    let response = app
        .send(with_cookie(
            empty_post("/auth/logout"),
            &format!("access_token={access}; refresh_token={refresh}"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    for name in ["access_token", "refresh_token", "auth-token"] {
        let cookie = set_cookie(&response, name).unwrap();
        assert!(cookie.contains("Max-Age=0"), "{cookie}");
    }
    assert!(
        set_cookie(&response, "refresh_token")
            .unwrap()
            .contains("Path=/auth")
    );
    assert!(json_body(response).await["message"].is_string());

    let response = app
        .send(with_cookie(
            empty_post("/auth/refresh"),
            &format!("refresh_token={refresh}"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_session_still_succeeds() {
    let app = TestApp::new();
    let response = app.send(empty_post("/auth/logout")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookie_headers(&response).len(), 3);
}

// =============================================================================
// Account self-service
// =============================================================================

#[tokio::test]
async fn change_password_requires_current_password() {
    let app = TestApp::new();
    app.seed("pw@sp.shop", Role::Customer).await;
    let (token, _) = app.login("pw@sp.shop").await;

    let response = app
        .send(with_bearer(
            post_json(
                "/auth/change-password",
                &json!({ "currentPassword": "wrong-guess", "newPassword": "jordan-one-85" }),
            ),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["details"][0]["field"],
        "currentPassword"
    );

    let response = app
        .send(with_bearer(
            post_json(
                "/auth/change-password",
                &json!({ "currentPassword": PASSWORD, "newPassword": "jordan-one-85" }),
            ),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.saw_audit(AuditEventKind::PasswordChanged).await);

    let response = app
        .send(post_json(
            "/auth/login",
            &json!({ "email": "pw@sp.shop", "password": "jordan-one-85" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn change_password_requires_authentication() {
    let app = TestApp::new();
    let response = app
        .send(post_json(
            "/auth/change-password",
            &json!({ "currentPassword": PASSWORD, "newPassword": "jordan-one-85" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.saw_audit(AuditEventKind::Unauthenticated).await);
}

#[tokio::test]
async fn update_profile_changes_name() {
    let app = TestApp::new();
    app.seed("name@sp.shop", Role::Customer).await;
    let (token, _) = app.login("name@sp.shop").await;

    let response = app
        .send(with_bearer(
            post_json("/auth/update-profile", &json!({ "name": "  Renamed " })),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"]["name"], "Renamed");

    let response = app
        .send(with_bearer(
            post_json("/auth/update-profile", &json!({ "name": "x".repeat(101) })),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn permissions_lists_role_defaults() {
    let app = TestApp::new();
    app.seed("perm@sp.shop", Role::Seller).await;
    let (token, _) = app.login("perm@sp.shop").await;

    let response = app
        .send(with_bearer(get("/auth/permissions"), &token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["role"], "seller");
    let permissions: Vec<_> = body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap().to_owned())
        .collect();
    assert!(permissions.contains(&"products:update".to_owned()));
    assert!(!permissions.contains(&"users:update".to_owned()));
}

// =============================================================================
// Admin and the authorization gate
// =============================================================================

#[tokio::test]
async fn admin_listing_is_gated_by_role() {
    let app = TestApp::new();
    app.seed("customer@sp.shop", Role::Customer).await;
    app.seed("boss@sp.shop", Role::Admin).await;

    let response = app.send(get("/admin/users")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "unauthenticated");

    let (customer, _) = app.login("customer@sp.shop").await;
    let response = app
        .send(with_bearer(get("/admin/users"), &customer))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "forbidden");
    assert!(app.saw_audit(AuditEventKind::Forbidden).await);
    let denial = app
        .store
        .audit_events()
        .into_iter()
        .find(|e| e.event == AuditEventKind::Forbidden)
        .unwrap();
    assert_eq!(denial.path, "/admin/users");
    assert!(denial.user_id.is_some());

    let (admin, _) = app.login("boss@sp.shop").await;
    let response = app
        .send(with_bearer(get("/admin/users?page=1&limit=1"), &admin))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["users"][0]["email"], "boss@sp.shop");
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["totalPages"], 2);
}

#[tokio::test]
async fn admin_listing_validates_limit() {
    let app = TestApp::new();
    app.seed("boss@sp.shop", Role::Admin).await;
    let (admin, _) = app.login("boss@sp.shop").await;

    for uri in [
        "/admin/users?limit=0",
        "/admin/users?limit=101",
        "/admin/users?page=0",
        "/admin/users?page=abc",
    ] {
        let response = app.send(with_bearer(get(uri), &admin)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn admin_updates_user_role() {
    let app = TestApp::new();
    let target = app.seed("target@sp.shop", Role::Customer).await;
    app.seed("boss@sp.shop", Role::Admin).await;
    let (admin, _) = app.login("boss@sp.shop").await;

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/admin/users/{target}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "role": "seller" }).to_string()))
        .unwrap();
    let response = app.send(with_bearer(request, &admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"]["role"], "seller");
    assert!(app.saw_audit(AuditEventKind::UserUpdated).await);
}

fn patch_user(id: impl std::fmt::Display, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(format!("/admin/users/{id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn admin_cannot_demote_or_deactivate_self() {
    let app = TestApp::new();
    let me = app.seed("boss@sp.shop", Role::Admin).await;
    let (admin, _) = app.login("boss@sp.shop").await;

    let response = app
        .send(with_bearer(patch_user(me, &json!({ "role": "customer" })), &admin))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(with_bearer(patch_user(me, &json!({ "isActive": false })), &admin))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(with_bearer(patch_user(9999, &json!({ "isActive": false })), &admin))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "not_found");
}

#[tokio::test]
async fn explicit_grant_opens_permission_gate() {
    let app = TestApp::new();
    let seller = app.seed("seller@sp.shop", Role::Seller).await;
    let target = app.seed("target@sp.shop", Role::Customer).await;
    let (token, _) = app.login("seller@sp.shop").await;

    let response = app
        .send(with_bearer(
            patch_user(target, &json!({ "isActive": false })),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.store
        .grant(seller, Permission::UsersUpdate)
        .await
        .unwrap();

    let response = app
        .send(with_bearer(
            patch_user(target, &json!({ "isActive": false })),
            &token,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"]["isActive"], false);
}

// =============================================================================
// Health and rate limiting
// =============================================================================

#[tokio::test]
async fn health_endpoints() {
    let app = TestApp::new();
    assert_eq!(app.send(get("/health")).await.status(), StatusCode::OK);
    assert_eq!(app.send(get("/health/ready")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn credential_routes_are_rate_limited_per_ip() {
    let app = TestApp::with_router(routes::rate_limited_routes().unwrap());

    let attempt = |ip: &str| {
        let mut request = post_json(
            "/auth/login",
            &json!({ "email": "nobody@sp.shop", "password": PASSWORD }),
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", ip.parse().unwrap());
        request
    };

    for _ in 0..5 {
        let response = app.send(attempt("203.0.113.10")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app.send(attempt("203.0.113.10")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"], "rate_limited");

    // Other clients are unaffected.
    let response = app.send(attempt("203.0.113.11")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Health checks sit outside the limiter.
    assert_eq!(app.send(get("/health")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_routes_sit_outside_the_limiter() {
    let app = TestApp::with_router(routes::rate_limited_routes().unwrap());
    let id = app.seed("browsing@sp.shop", Role::Customer).await;
    let user = CurrentUser {
        id,
        email: Email::parse("browsing@sp.shop").unwrap(),
        role: Role::Customer,
    };
    let access = tokens().issue(&user, TokenKind::Access).unwrap();

    for _ in 0..8 {
        let mut request = with_bearer(get("/auth/me"), &access);
        request
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.20".parse().unwrap());
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let mut request = with_bearer(get("/auth/permissions"), &access);
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.20".parse().unwrap());
    assert_eq!(app.send(request).await.status(), StatusCode::OK);
}
