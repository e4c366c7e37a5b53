//! User management commands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//! - `SNEAKPEAK_USER_PASSWORD` - password for `user create`; read from stdin
//!   when unset

use std::io::BufRead;

use sneakpeak_core::{Email, Permission, Role, UserId};
use sneakpeak_storefront::db::{
    PermissionLookup, PermissionRepository, RepositoryError, UserRepository, UserStore,
};
use sneakpeak_storefront::models::{AdminUserUpdate, NewUser};
use sneakpeak_storefront::services::auth::{FieldError, Hasher, validate};

use super::{CliError, connect};

/// Environment variable holding the new user's password.
pub const PASSWORD_ENV: &str = "SNEAKPEAK_USER_PASSWORD";

/// Take the password from the environment, else the first line of `input`.
pub fn read_password(from_env: Option<String>, mut input: impl BufRead) -> Result<String, CliError> {
    if let Some(password) = from_env {
        return Ok(password);
    }

    tracing::info!("Reading password from stdin");
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn invalid(errors: &[FieldError]) -> CliError {
    CliError::InvalidInput(
        errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Validate the fields `user create` takes from the command line.
fn validate_new_user(
    email: &str,
    name: &str,
    password: &str,
) -> Result<(Email, String), CliError> {
    let mut errors = Vec::new();
    let email = validate::email(email, &mut errors);
    validate::password("password", password, &mut errors);
    let name = validate::name(name, &mut errors);

    match (email, name) {
        (Some(email), Some(name)) if errors.is_empty() => Ok((email, name)),
        _ => Err(invalid(&errors)),
    }
}

fn parse_email(raw: &str) -> Result<Email, CliError> {
    let mut errors = Vec::new();
    validate::email(raw, &mut errors).ok_or_else(|| invalid(&errors))
}

async fn user_id_by_email(users: &UserRepository, email: &Email) -> Result<UserId, CliError> {
    users
        .find_by_email(email)
        .await?
        .map(|u| u.id)
        .ok_or_else(|| CliError::UserNotFound(email.to_string()))
}

/// Create a user with the given role.
pub async fn create(email: &str, name: &str, role: Role, password: &str) -> Result<(), CliError> {
    let (email, name) = validate_new_user(email, name, password)?;
    let password_hash = Hasher::new()
        .and_then(|hasher| hasher.hash(password))
        .map_err(|_| CliError::PasswordHash)?;

    let users = UserRepository::new(connect().await?);
    let user = users
        .create(NewUser {
            email: email.clone(),
            password_hash,
            name,
            role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CliError::UserExists(email.to_string()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "User created");
    Ok(())
}

/// Change a user's role.
pub async fn set_role(email: &str, role: Role) -> Result<(), CliError> {
    let email = parse_email(email)?;
    let users = UserRepository::new(connect().await?);
    let id = user_id_by_email(&users, &email).await?;

    users
        .update_admin(
            id,
            AdminUserUpdate {
                role: Some(role),
                is_active: None,
            },
        )
        .await?;

    tracing::info!(user_id = %id, %role, "Role updated");
    Ok(())
}

/// Grant one permission beyond the user's role defaults.
pub async fn grant(email: &str, permission: Permission) -> Result<(), CliError> {
    let email = parse_email(email)?;
    let pool = connect().await?;
    let id = user_id_by_email(&UserRepository::new(pool.clone()), &email).await?;

    PermissionRepository::new(pool).grant(id, permission).await?;

    tracing::info!(user_id = %id, %permission, "Permission granted");
    Ok(())
}
