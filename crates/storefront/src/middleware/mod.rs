//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Rate limiting on login and registration (governor)
//!
//! Authentication is not a layer: handlers opt in through the extractors in
//! [`auth`].

pub mod auth;
pub mod client_ip;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{
    Decision, DenyReason, Gate, OptionalUser, RequireAdmin, RequireStaff, RequireUser,
    Requirement, authorize, resolve,
};
pub use client_ip::{ClientContext, client_ip};
pub use rate_limit::{auth_rate_limiter, rate_limited_json};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
