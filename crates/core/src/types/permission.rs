//! Named capabilities checked by the authorization gate.
//!
//! Permissions use the `resource:action` string form on the wire and in the
//! database. `*_own` actions are scoped to the caller's own records; enforcing
//! the ownership part is up to the handler that serves the resource.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown permission string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid permission: {0}")]
pub struct PermissionError(pub String);

/// A named capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "users:read")]
    UsersRead,
    #[serde(rename = "users:create")]
    UsersCreate,
    #[serde(rename = "users:update")]
    UsersUpdate,
    #[serde(rename = "users:delete")]
    UsersDelete,
    #[serde(rename = "products:read")]
    ProductsRead,
    #[serde(rename = "products:create")]
    ProductsCreate,
    #[serde(rename = "products:update")]
    ProductsUpdate,
    #[serde(rename = "products:delete")]
    ProductsDelete,
    #[serde(rename = "orders:read")]
    OrdersRead,
    #[serde(rename = "orders:read_own")]
    OrdersReadOwn,
    #[serde(rename = "orders:update")]
    OrdersUpdate,
    #[serde(rename = "orders:cancel")]
    OrdersCancel,
    #[serde(rename = "cart:read_own")]
    CartReadOwn,
    #[serde(rename = "cart:update_own")]
    CartUpdateOwn,
    #[serde(rename = "wishlist:read_own")]
    WishlistReadOwn,
    #[serde(rename = "wishlist:update_own")]
    WishlistUpdateOwn,
    #[serde(rename = "analytics:read")]
    AnalyticsRead,
    #[serde(rename = "system:admin")]
    SystemAdmin,
}

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Self; 18] = [
        Self::UsersRead,
        Self::UsersCreate,
        Self::UsersUpdate,
        Self::UsersDelete,
        Self::ProductsRead,
        Self::ProductsCreate,
        Self::ProductsUpdate,
        Self::ProductsDelete,
        Self::OrdersRead,
        Self::OrdersReadOwn,
        Self::OrdersUpdate,
        Self::OrdersCancel,
        Self::CartReadOwn,
        Self::CartUpdateOwn,
        Self::WishlistReadOwn,
        Self::WishlistUpdateOwn,
        Self::AnalyticsRead,
        Self::SystemAdmin,
    ];

    /// Returns the `resource:action` form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UsersRead => "users:read",
            Self::UsersCreate => "users:create",
            Self::UsersUpdate => "users:update",
            Self::UsersDelete => "users:delete",
            Self::ProductsRead => "products:read",
            Self::ProductsCreate => "products:create",
            Self::ProductsUpdate => "products:update",
            Self::ProductsDelete => "products:delete",
            Self::OrdersRead => "orders:read",
            Self::OrdersReadOwn => "orders:read_own",
            Self::OrdersUpdate => "orders:update",
            Self::OrdersCancel => "orders:cancel",
            Self::CartReadOwn => "cart:read_own",
            Self::CartUpdateOwn => "cart:update_own",
            Self::WishlistReadOwn => "wishlist:read_own",
            Self::WishlistUpdateOwn => "wishlist:update_own",
            Self::AnalyticsRead => "analytics:read",
            Self::SystemAdmin => "system:admin",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PermissionError(s.to_owned()))
    }
}
