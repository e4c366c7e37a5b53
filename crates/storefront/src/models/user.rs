//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sneakpeak_core::{Email, Role, UserId};

use super::CurrentUser;

/// A storefront user (domain type).
///
/// Carries the password hash, so it is never serialized. Use [`PublicUser`]
/// for anything that leaves the process.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Display name.
    pub name: String,
    /// Permission tier.
    pub role: Role,
    /// Inactive users cannot log in or refresh.
    pub is_active: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Identity embedded in tokens issued for this user.
    #[must_use]
    pub fn identity(&self) -> CurrentUser {
        CurrentUser {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// User fields safe to return to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Validated input for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

/// Fields an administrator may change on another account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl AdminUserUpdate {
    /// True when the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_active.is_none()
    }
}

/// A page of a listing, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Rows to skip before this page.
    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned alongside a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    #[must_use]
    pub fn new(request: PageRequest, total: i64) -> Self {
        let limit = i64::from(request.limit.max(1));
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: UserId::new(5),
            email: Email::parse("kicks@sneakpeak.shop").unwrap(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$salt$hash".to_owned(),
            name: "Kicks".to_owned(),
            role: Role::Seller,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_user_hides_password_hash() {
        let json = serde_json::to_value(PublicUser::from(&sample_user())).unwrap();
        assert_eq!(json["email"], "kicks@sneakpeak.shop");
        assert_eq!(json["role"], "seller");
        assert_eq!(json["isActive"], true);
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_identity_copies_role() {
        let identity = sample_user().identity();
        assert_eq!(identity.id, UserId::new(5));
        assert_eq!(identity.role, Role::Seller);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(PageRequest { page: 1, limit: 20 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 10 }.offset(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let request = PageRequest { page: 1, limit: 20 };
        assert_eq!(Pagination::new(request, 0).total_pages, 0);
        assert_eq!(Pagination::new(request, 20).total_pages, 1);
        assert_eq!(Pagination::new(request, 21).total_pages, 2);
    }

    #[test]
    fn test_admin_update_accepts_camel_case() {
        let update: AdminUserUpdate =
            serde_json::from_str(r#"{"role":"admin","isActive":false}"#).unwrap();
        assert_eq!(update.role, Some(Role::Admin));
        assert_eq!(update.is_active, Some(false));
        assert!(AdminUserUpdate::default().is_empty());
    }
}
