//! User management endpoints for administrators.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use sneakpeak_core::{Permission, UserId};

use crate::db::RepositoryError;
use crate::error::{AppError, Result, json_body};
use crate::middleware::{ClientContext, Gate, RequireAdmin};
use crate::models::{
    AdminUserUpdate, AuditEvent, AuditEventKind, PageRequest, Pagination, PublicUser,
};
use crate::state::AppState;

/// Query parameters for the user listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListUsersQuery {
    fn page_request(&self) -> Result<PageRequest> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::field("page", "page must be at least 1"));
        }

        let limit = self.limit.unwrap_or(PageRequest::DEFAULT_LIMIT);
        if !(1..=PageRequest::MAX_LIMIT).contains(&limit) {
            return Err(AppError::field(
                "limit",
                format!("limit must be between 1 and {}", PageRequest::MAX_LIMIT),
            ));
        }

        Ok(PageRequest { page, limit })
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<PublicUser>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

/// List users, newest first.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    query: std::result::Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<UserListResponse>> {
    let Query(query) = query.map_err(|e| AppError::field("query", e.body_text()))?;
    let page = query.page_request()?;

    let (users, total) = state.users().list(page).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(PublicUser::from).collect(),
        pagination: Pagination::new(page, total),
    }))
}

/// Change another user's role or activity flag.
///
/// Requires `users:update`. Administrators cannot demote or deactivate
/// themselves.
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    gate: Gate,
    context: ClientContext,
    id: std::result::Result<Path<i32>, PathRejection>,
    body: std::result::Result<Json<AdminUserUpdate>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let actor = gate.require_permission(Permission::UsersUpdate).await?;

    let Path(id) = id.map_err(|_| AppError::NotFound("user".to_owned()))?;
    let target = UserId::new(id);
    let update = json_body(body)?;

    if update.is_empty() {
        return Err(AppError::field("body", "nothing to update"));
    }
    if target == actor.id {
        if update.role.is_some_and(|role| role != actor.role) {
            return Err(AppError::field("role", "you cannot change your own role"));
        }
        if update.is_active == Some(false) {
            return Err(AppError::field(
                "isActive",
                "you cannot deactivate your own account",
            ));
        }
    }

    let user = state
        .users()
        .update_admin(target, update)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("user".to_owned()),
            other => AppError::Database(other),
        })?;

    tracing::info!(actor_id = %actor.id, target_id = %target, "User updated by admin");
    state.audit().emit(
        AuditEvent::new(AuditEventKind::UserUpdated, context.path)
            .user(actor.id)
            .ip(context.ip)
            .details(json!({
                "targetUserId": target,
                "role": update.role,
                "isActive": update.is_active,
            })),
    );

    Ok(Json(UserResponse { user: user.into() }))
}
