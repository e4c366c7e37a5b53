//! Storefront user roles.

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Error returned when parsing an unknown role string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleError(pub String);

/// Coarse-grained permission tier for a storefront user.
///
/// Stored as `TEXT` in the database and carried in every token, so the string
/// form returned by [`Role::as_str`] is part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shopper browsing the catalog and placing orders.
    #[default]
    Customer,
    /// Back-office user managing stock and orders.
    #[serde(alias = "moderator")]
    Seller,
    /// Full access, including user management.
    Admin,
}

impl Role {
    /// All roles, lowest privilege first.
    pub const ALL: [Self; 3] = [Self::Customer, Self::Seller, Self::Admin];

    /// Returns the canonical string form of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }

    /// Permissions granted to every user with this role.
    #[must_use]
    pub const fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Customer => &[
                Permission::ProductsRead,
                Permission::OrdersReadOwn,
                Permission::CartReadOwn,
                Permission::CartUpdateOwn,
                Permission::WishlistReadOwn,
                Permission::WishlistUpdateOwn,
            ],
            Self::Seller => &[
                Permission::ProductsRead,
                Permission::ProductsCreate,
                Permission::ProductsUpdate,
                Permission::OrdersRead,
                Permission::OrdersUpdate,
                Permission::AnalyticsRead,
            ],
            Self::Admin => &Permission::ALL,
        }
    }

    /// Whether this role grants `permission` by default.
    #[must_use]
    pub fn grants(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "seller" | "moderator" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleError(s.to_owned())),
        }
    }
}
