//! In-memory implementation of every store trait.
//!
//! Used by the router tests and for running the service without a database.
//! A single mutex guards all tables, so the email uniqueness check and the
//! denylist insert are atomic just like their `PostgreSQL` counterparts.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sneakpeak_core::{Email, Permission, UserId};

use super::{AuditSink, PermissionLookup, RepositoryError, TokenDenylist, UserStore};
use crate::models::{AdminUserUpdate, AuditEvent, NewUser, PageRequest, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    next_id: i32,
    grants: HashSet<(UserId, Permission)>,
    revoked: HashMap<String, DateTime<Utc>>,
    audit: Vec<AuditEvent>,
}

impl Tables {
    fn user_mut(&mut self, id: UserId) -> Result<&mut User, RepositoryError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// Process-local store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Audit records written so far, oldest first.
    #[must_use]
    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.lock().audit.clone()
    }

    /// Number of stored users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    /// Whether `jti` is on the denylist.
    #[must_use]
    pub fn is_revoked(&self, jti: &str) -> bool {
        self.lock().revoked.contains_key(jti)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.iter().find(|u| &u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        tables.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: UserId::new(tables.next_id),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        let user = tables.user_mut(id)?;
        password_hash.clone_into(&mut user.password_hash);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_name(&self, id: UserId, name: &str) -> Result<User, RepositoryError> {
        let mut tables = self.lock();
        let user = tables.user_mut(id)?;
        name.clone_into(&mut user.name);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_admin(
        &self,
        id: UserId,
        update: AdminUserUpdate,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.lock();
        let user = tables.user_mut(id)?;
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64), RepositoryError> {
        let tables = self.lock();
        let total = i64::try_from(tables.users.len())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);

        // Ids are assigned in insertion order, so reverse id order is newest first.
        let users = tables
            .users
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((users, total))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl PermissionLookup for MemoryStore {
    async fn has_permission(
        &self,
        user_id: UserId,
        permission: Permission,
    ) -> Result<bool, RepositoryError> {
        Ok(self.lock().grants.contains(&(user_id, permission)))
    }

    async fn grant(&self, user_id: UserId, permission: Permission) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        tables.user_mut(user_id)?;
        tables.grants.insert((user_id, permission));
        Ok(())
    }
}

#[async_trait]
impl TokenDenylist for MemoryStore {
    async fn revoke(
        &self,
        jti: &str,
        _user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock();
        if tables.revoked.contains_key(jti) {
            return Ok(false);
        }
        tables.revoked.insert(jti.to_owned(), expires_at);
        Ok(true)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut tables = self.lock();
        let before = tables.revoked.len();
        tables.revoked.retain(|_, expires_at| *expires_at > now);
        Ok((before - tables.revoked.len()) as u64)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        self.lock().audit.push(event.clone());
        Ok(())
    }
}
