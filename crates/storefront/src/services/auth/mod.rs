//! Authentication service.
//!
//! Provides password registration and login plus the account self-service
//! operations. Token handling lives in [`tokens`], hashing in [`password`].

mod error;
pub mod password;
pub mod tokens;
pub mod validate;

pub use error::{AuthError, FieldError};
pub use password::Hasher;
pub use tokens::{Claims, TokenKind, TokenPair, TokenService};

use sneakpeak_core::{Email, Role, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// Authentication service.
///
/// Handles user registration, login, and password/profile changes.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    hasher: &'a Hasher,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, hasher: &'a Hasher) -> Self {
        Self { users, hasher }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new customer with email, password and display name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` listing every invalid field.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, AuthError> {
        let mut errors = Vec::new();
        let email = validate::email(email, &mut errors);
        validate::password("password", password, &mut errors);
        let name = validate::name(name, &mut errors);

        let (Some(email), Some(name), true) = (email, name, errors.is_empty()) else {
            return Err(AuthError::Validation(errors));
        };

        let password_hash = self.hasher.hash_blocking(password).await?;

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                name,
                role: Role::Customer,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// Every failure is `InvalidCredentials`, and a hash verification runs on
    /// every path so response time does not reveal whether the email exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong
    /// or the account is inactive.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Ok(email) = Email::parse(email) else {
            self.hasher.verify_dummy_blocking(password).await;
            return Err(AuthError::InvalidCredentials);
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            self.hasher.verify_dummy_blocking(password).await;
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify_blocking(password, &user.password_hash).await || !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    // =========================================================================
    // Account Self-Service
    // =========================================================================

    /// Replace the password of `user_id` after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the current password is wrong, the
    /// new one is invalid, or both are the same.
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        validate::password("newPassword", new_password, &mut errors);
        if current_password == new_password {
            errors.push(FieldError::new(
                "newPassword",
                "new password must differ from the current password",
            ));
        }
        if !errors.is_empty() {
            return Err(AuthError::Validation(errors));
        }

        let user = self.get_user(user_id).await?;
        if !self.hasher.verify_blocking(current_password, &user.password_hash).await {
            return Err(AuthError::field(
                "currentPassword",
                "current password is incorrect",
            ));
        }

        let password_hash = self.hasher.hash_blocking(new_password).await?;
        self.users
            .update_password(user_id, &password_hash)
            .await
            .map_err(not_found_as_missing_user)
    }

    /// Change the display name of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the name is invalid.
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    pub async fn update_profile(&self, user_id: UserId, name: &str) -> Result<User, AuthError> {
        let mut errors = Vec::new();
        let Some(name) = validate::name(name, &mut errors) else {
            return Err(AuthError::Validation(errors));
        };

        self.users
            .update_name(user_id, &name)
            .await
            .map_err(not_found_as_missing_user)
    }

    /// Load an active user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user is missing or inactive.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::UserNotFound)
    }
}

fn not_found_as_missing_user(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::NotFound => AuthError::UserNotFound,
        other => AuthError::Repository(other),
    }
}
