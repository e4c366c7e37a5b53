//! SneakPeak storefront authentication service.
//!
//! Login, token refresh, registration and account endpoints, plus the
//! session resolver and authorization gate other storefront routes build on.
//! This crate provides the service as a library so the router can be tested
//! without a running server.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
