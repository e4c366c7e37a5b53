//! SneakPeak Core - Shared domain types.
//!
//! This crate provides the types shared by every SneakPeak component:
//! - `storefront` - Authentication, session and authorization service
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, normalized emails, roles and permissions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
