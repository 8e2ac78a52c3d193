//! User administration and client membership.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use brandkit_core::models::{Client, UpdateUserRoleRequest, User, UserRole};
use brandkit_core::AppError;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::middleware::audit;
use crate::state::AppState;
use crate::utils::access::{require_client, require_role};

async fn load_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state
        .repos
        .users
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Admins may only act on users at or below what they could assign
fn ensure_can_manage(auth: &AuthUser, target: &User) -> Result<(), AppError> {
    if !auth.role().can_manage_users() {
        return Err(AppError::Forbidden("Only admins can manage users".to_string()));
    }
    if !auth.role().can_assign_role(target.role) {
        return Err(AppError::Forbidden(format!(
            "You cannot manage users with the {} role",
            target.role
        )));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "Users visible to the caller", body = Vec<User>),
        (status = 403, description = "Caller is below admin", body = ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<User>>, HttpAppError> {
    require_role(&auth, UserRole::Admin)?;

    let users = state.repos.users.list().await?;
    if auth.actor.is_super_admin() {
        return Ok(Json(users));
    }

    // Admins see the members of their own clients
    let mut visible = Vec::new();
    for user in users {
        let client_ids = state.repos.clients.client_ids_for_user(user.id).await?;
        if user.id == auth.user_id() || client_ids.iter().any(|c| auth.actor.is_member(*c)) {
            visible.push(user);
        }
    }
    Ok(Json(visible))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/role",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 400, description = "Attempt to change own role", body = ErrorResponse),
        (status = 403, description = "Role outside the caller's authority", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id(), target_id = %id))]
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRoleRequest>,
) -> Result<Json<User>, HttpAppError> {
    if id == auth.user_id() {
        return Err(AppError::BadRequest("You cannot change your own role".to_string()).into());
    }
    let target = load_user(&state, id).await?;
    ensure_can_manage(&auth, &target)?;
    if !auth.role().can_assign_role(request.role) {
        return Err(AppError::Forbidden(format!(
            "You cannot assign the {} role",
            request.role
        ))
        .into());
    }

    let updated = state
        .repos
        .users
        .update_role(id, request.role)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    audit::log_role_change(auth.user_id(), id, target.role, request.role);
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id(), target_id = %id))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    if id == auth.user_id() {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()).into());
    }
    let target = load_user(&state, id).await?;
    ensure_can_manage(&auth, &target)?;

    if !state.repos.users.delete(id).await? {
        return Err(AppError::NotFound("User not found".to_string()).into());
    }
    audit::log_user_deleted(auth.user_id(), id);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/clients",
    tag = "users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Clients the user belongs to", body = Vec<Client>))
)]
pub async fn list_user_clients(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Client>>, HttpAppError> {
    if id != auth.user_id() {
        require_role(&auth, UserRole::Admin)?;
    }
    load_user(&state, id).await?;
    Ok(Json(state.repos.clients.list_for_user(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/clients/{client_id}",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("client_id" = Uuid, Path, description = "Client ID")
    ),
    responses((status = 204, description = "Membership added"))
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn add_user_to_client(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((id, client_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let target = load_user(&state, id).await?;
    ensure_can_manage(&auth, &target)?;
    require_client(&state.repos, &auth, client_id).await?;

    state.repos.clients.add_member(client_id, id).await?;
    audit::log_membership_change(auth.user_id(), id, client_id, true);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/clients/{client_id}",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("client_id" = Uuid, Path, description = "Client ID")
    ),
    responses(
        (status = 204, description = "Membership removed"),
        (status = 404, description = "User is not a member", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn remove_user_from_client(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((id, client_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    let target = load_user(&state, id).await?;
    ensure_can_manage(&auth, &target)?;
    require_client(&state.repos, &auth, client_id).await?;

    if !state.repos.clients.remove_member(client_id, id).await? {
        return Err(AppError::NotFound("User is not a member of this client".to_string()).into());
    }
    audit::log_membership_change(auth.user_id(), id, client_id, false);
    Ok(StatusCode::NO_CONTENT)
}
