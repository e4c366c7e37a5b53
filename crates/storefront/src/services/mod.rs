//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Password authentication, token issuing and account self-service
//! - `audit` - Fire-and-forget security audit trail

pub mod audit;
pub mod auth;
