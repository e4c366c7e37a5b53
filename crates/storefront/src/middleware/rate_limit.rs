//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Login and registration are limited per client IP to roughly 10 requests per
//! minute. Rejections are rewritten into the standard JSON error body.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use super::client_ip::client_ip;
use crate::error::AppError;

/// Key extractor using the real client IP behind Cloudflare and Fly.io.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req.headers(), req.extensions()).ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
/// This slows brute force attempts on login and registration.
///
/// Returns `None` only if the governor configuration is rejected.
#[must_use]
pub fn auth_rate_limiter() -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5) // Allow burst of 5 requests
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

/// Rewrite the limiter's plain-text 429 into a `rate_limited` JSON error.
///
/// Headers such as `retry-after` are carried over.
pub async fn rate_limited_json(response: Response) -> Response {
    let is_plain_429 = response.status() == StatusCode::TOO_MANY_REQUESTS
        && response
            .headers()
            .get(CONTENT_TYPE)
            .is_none_or(|v| !v.as_bytes().starts_with(b"application/json"));
    if !is_plain_429 {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut rewritten = AppError::RateLimited.into_response();
    for (name, value) in &parts.headers {
        if name != CONTENT_TYPE && name != axum::http::header::CONTENT_LENGTH {
            rewritten.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rewritten
}
