//! Field validation shared by registration and account updates.

use sneakpeak_core::Email;

use super::FieldError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_NAME_LENGTH: usize = 100;

/// Parse an email, recording a field error on failure.
pub fn email(raw: &str, errors: &mut Vec<FieldError>) -> Option<Email> {
    match Email::parse(raw) {
        Ok(email) => Some(email),
        Err(e) => {
            errors.push(FieldError::new("email", e.to_string()));
            None
        }
    }
}

/// Check password length in characters.
pub fn password(field: &'static str, raw: &str, errors: &mut Vec<FieldError>) {
    let len = raw.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        errors.push(FieldError::new(
            field,
            format!("password must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    } else if len > MAX_PASSWORD_LENGTH {
        errors.push(FieldError::new(
            field,
            format!("password must be at most {MAX_PASSWORD_LENGTH} characters"),
        ));
    }
}

/// Trim a display name and check it, recording a field error on failure.
pub fn name(raw: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new("name", "name is required"));
        return None;
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            "name",
            format!("name must be at most {MAX_NAME_LENGTH} characters"),
        ));
        return None;
    }
    Some(trimmed.to_owned())
}
