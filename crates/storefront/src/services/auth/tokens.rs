//! Signed access and refresh tokens.
//!
//! Tokens are HS256 JWTs. Verification never errors: anything that is not a
//! valid, unexpired token of the requested kind comes back as `None`.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sneakpeak_core::{Email, Role, UserId};

use super::AuthError;
use crate::models::CurrentUser;

pub const ISSUER: &str = "sneakpeak";
pub const AUDIENCE: &str = "sneakpeak-users";

const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Which of the two token kinds a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Lifetime in seconds.
    #[must_use]
    pub const fn ttl_secs(self) -> i64 {
        match self {
            Self::Access => ACCESS_TOKEN_TTL_SECS,
            Self::Refresh => REFRESH_TOKEN_TTL_SECS,
        }
    }
}

/// Claim set carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub email: Email,
    pub role: Role,
    pub typ: TokenKind,
    /// Random per-token ID, used for refresh token revocation.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    #[must_use]
    pub fn current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.sub,
            email: self.email.clone(),
            role: self.role,
        }
    }

    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A freshly issued access + refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and verifies tokens with one signing secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);
        // `sub` is numeric, so its presence is enforced by `Claims` itself.
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        // Expiry is checked against an explicit clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `user` valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, user: &CurrentUser, kind: TokenKind) -> Result<String, AuthError> {
        self.issue_at(user, kind, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue_at(
        &self,
        user: &CurrentUser,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            typ: kind,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp: iat + kind.ttl_secs(),
            iss: ISSUER.to_owned(),
            aud: AUDIENCE.to_owned(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Issue an access token and a refresh token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue_pair(&self, user: &CurrentUser) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        Ok(TokenPair {
            access: self.issue_at(user, TokenKind::Access, now)?,
            refresh: self.issue_at(user, TokenKind::Refresh, now)?,
        })
    }

    /// Verify a token of the given kind against the current time.
    #[must_use]
    pub fn verify(&self, token: &str, kind: TokenKind) -> Option<Claims> {
        self.verify_at(token, kind, Utc::now())
    }

    /// Verify a token of the given kind as if the current time were `now`.
    ///
    /// A token is rejected at or after its `exp`.
    #[must_use]
    pub fn verify_at(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Option<Claims> {
        if token.is_empty() {
            return None;
        }

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation).ok()?;
        let claims = data.claims;

        if claims.typ != kind || now.timestamp() >= claims.exp {
            return None;
        }

        Some(claims)
    }
}
