//! Session-related types.
//!
//! The storefront is stateless: identity travels in signed tokens and is
//! rebuilt from them on every request.

use serde::{Deserialize, Serialize};

use sneakpeak_core::{Email, Role, UserId};

/// Identity of the caller, taken from a verified access token.
///
/// This is the only identity type handlers see. Its role comes from the token,
/// never from anything else the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Role at the time the token was issued.
    pub role: Role,
}

/// Cookie names used by the auth endpoints.
pub mod cookies {
    /// Short-lived access token, sent on every path.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Long-lived refresh token, scoped to `/auth`.
    pub const REFRESH_TOKEN: &str = "refresh_token";

    /// Token cookie set by older clients. Read and cleared, never written.
    pub const LEGACY_AUTH_TOKEN: &str = "auth-token";

    /// Path the refresh cookie is scoped to.
    pub const REFRESH_TOKEN_PATH: &str = "/auth";
}
