//! Integration tests for the SneakPeak storefront.
//!
//! These run against a live server and database:
//!
//! ```bash
//! sp-cli migrate
//! cargo run -p sneakpeak-storefront &
//! cargo test -p sneakpeak-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_TEST_URL` points the tests at a server other than
//! `http://localhost:3000`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use reqwest::{Client, Response};
use serde_json::{Value, json};

/// Password used for every account the tests register.
pub const TEST_PASSWORD: &str = "integration-kicks-42";

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// An email no earlier run has registered.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@sneakpeak.test", uuid::Uuid::new_v4().simple())
}

/// HTTP client with its own cookie jar, bound to the storefront.
pub struct TestClient {
    pub client: Client,
    pub base_url: String,
}

impl TestClient {
    /// Build a client with a fresh cookie store.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().cookie_store(true).build()?,
            base_url: storefront_base_url(),
        })
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body.
    ///
    /// # Errors
    ///
    /// Returns transport errors only; HTTP error statuses are returned as
    /// responses.
    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Result<Response> {
        self.client.post(self.url(path)).json(body).send().await
    }

    /// GET a path.
    ///
    /// # Errors
    ///
    /// Returns transport errors only.
    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.client.get(self.url(path)).send().await
    }

    /// Register `email` with [`TEST_PASSWORD`].
    ///
    /// # Errors
    ///
    /// Returns transport errors only.
    pub async fn register(&self, email: &str) -> reqwest::Result<Response> {
        self.post(
            "/auth/register",
            &json!({ "email": email, "password": TEST_PASSWORD, "name": "Integration" }),
        )
        .await
    }

    /// Log in as `email`, storing the session cookies in this client.
    ///
    /// # Errors
    ///
    /// Returns transport errors only.
    pub async fn login(&self, email: &str) -> reqwest::Result<Response> {
        self.post(
            "/auth/login",
            &json!({ "email": email, "password": TEST_PASSWORD }),
        )
        .await
    }
}
