//! Client IP resolution behind Cloudflare and Fly.io.
//!
//! Proxy headers are checked in order (`CF-Connecting-IP`, first hop of
//! `X-Forwarded-For`, `X-Real-IP`, `Fly-Client-IP`), then the socket peer
//! address if the server was started with connect info.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts, OriginalUri};
use axum::http::{Extensions, HeaderMap, request::Parts};

/// Where a request came from: full path and client IP. Used for audit records.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub path: String,
    pub ip: Option<IpAddr>,
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Nested routers see a stripped URI; the original is kept in extensions.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path(), |uri| uri.0.path())
            .to_owned();

        Ok(Self {
            path,
            ip: client_ip(&parts.headers, &parts.extensions),
        })
    }
}

/// Best-effort client IP for a request.
#[must_use]
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    forwarded_ip(headers).or_else(|| {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    // Try CF-Connecting-IP first (Cloudflare's real client IP)
    if let Some(ip) = header("cf-connecting-ip").and_then(|s| s.trim().parse().ok()) {
        return Some(ip);
    }

    // Try X-Forwarded-For (first IP in the chain)
    if let Some(ip) = header("x-forwarded-for")
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
    {
        return Some(ip);
    }

    header("x-real-ip")
        .or_else(|| header("fly-client-ip"))
        .and_then(|s| s.trim().parse().ok())
}
