//! Argon2id password hashing.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::AuthError;

/// Plaintext hashed at startup so that logins for unknown emails still pay
/// for one full verification.
const DUMMY_PASSWORD: &str = "sneakpeak-timing-equalizer";

/// Password hasher with fixed Argon2id parameters.
#[derive(Clone)]
pub struct Hasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl Hasher {
    /// Hasher with the `argon2` crate's recommended parameters
    /// (19 MiB memory, 2 iterations, 1 lane).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if the timing-equalizer hash cannot be computed.
    pub fn new() -> Result<Self, AuthError> {
        Self::with_params(Params::default())
    }

    /// Hasher with explicit parameters. Tests use this with tiny costs.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if the timing-equalizer hash cannot be computed.
    pub fn with_params(params: Params) -> Result<Self, AuthError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, DUMMY_PASSWORD)?;
        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a password into a PHC string with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        hash_with(&self.argon2, password)
    }

    /// Check `password` against a stored PHC string.
    ///
    /// An unparseable hash counts as a mismatch.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Run a verification whose result is thrown away.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }

    /// [`Hasher::hash`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails or the task panics.
    pub async fn hash_blocking(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|_| AuthError::PasswordHash)?
    }

    /// [`Hasher::verify`] on the blocking thread pool. A panicked task is a mismatch.
    pub async fn verify_blocking(&self, password: &str, hash: &str) -> bool {
        let hasher = self.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .unwrap_or(false)
    }

    /// [`Hasher::verify_dummy`] on the blocking thread pool.
    pub async fn verify_dummy_blocking(&self, password: &str) {
        let hasher = self.clone();
        let password = password.to_owned();
        let _ = tokio::task::spawn_blocking(move || hasher.verify_dummy(&password)).await;
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}
