//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{PermissionLookup, Stores, TokenDenylist, UserStore};
use crate::services::audit::AuditLog;
use crate::services::auth::{AuthService, Hasher, TokenService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like stores, signing keys and configuration. It is
/// built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stores: Stores,
    tokens: TokenService,
    hasher: Hasher,
    audit: AuditLog,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration (signing secret, cookie policy)
    /// * `stores` - Store handles, `PostgreSQL` or in-memory
    /// * `hasher` - Password hasher
    #[must_use]
    pub fn new(config: StorefrontConfig, stores: Stores, hasher: Hasher) -> Self {
        let tokens = TokenService::new(&config.jwt_secret);
        let audit = AuditLog::new(Arc::clone(&stores.audit));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                tokens,
                hasher,
                audit,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.stores.users.as_ref()
    }

    #[must_use]
    pub fn permissions(&self) -> &dyn PermissionLookup {
        self.inner.stores.permissions.as_ref()
    }

    #[must_use]
    pub fn revoked_tokens(&self) -> &dyn TokenDenylist {
        self.inner.stores.tokens.as_ref()
    }

    /// Token issuer and verifier.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.inner.audit
    }

    /// Authentication service bound to this state's store and hasher.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.users(), &self.inner.hasher)
    }
}
