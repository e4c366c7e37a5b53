//! Core types for SneakPeak.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod permission;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use permission::{Permission, PermissionError};
pub use role::{Role, RoleError};
