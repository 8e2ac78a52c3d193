use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use brandkit_core::models::{Client, CreateClientRequest, UpdateClientRequest, User, UserRole};
use brandkit_core::AppError;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::access::{require_client, require_role};

fn require_client_admin(auth: &AuthUser) -> Result<(), AppError> {
    if auth.role().can_manage_clients() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only super admins can manage clients".to_string(),
        ))
    }
}

fn validate_primary_color(color: Option<&str>) -> Result<(), AppError> {
    if let Some(color) = color {
        brandkit_core::colors::parse_hex(color)?;
    }
    Ok(())
}

/// Clients visible to the caller: every client for super admins, memberships otherwise
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "clients",
    responses((status = 200, description = "Visible clients in display order", body = Vec<Client>))
)]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<Client>>, HttpAppError> {
    let clients = if auth.actor.is_super_admin() {
        state.repos.clients.list_all().await?
    } else {
        state.repos.clients.list_for_user(auth.user_id()).await?
    };
    Ok(Json(clients))
}

#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = Client),
        (status = 403, description = "Caller is not a super admin", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id()))]
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), HttpAppError> {
    require_client_admin(&auth)?;
    validate_primary_color(request.primary_color.as_deref())?;

    let client = state
        .repos
        .clients
        .create(&request, Some(auth.user_id()))
        .await?;
    tracing::info!(client_id = %client.id, name = %client.name, "Client created");
    Ok((StatusCode::CREATED, Json(client)))
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client", body = Client),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse)
    )
)]
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, HttpAppError> {
    Ok(Json(require_client(&state.repos, &auth, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    request_body = UpdateClientRequest,
    responses((status = 200, description = "Client updated", body = Client))
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id(), client_id = %id))]
pub async fn update_client(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<Client>, HttpAppError> {
    require_client(&state.repos, &auth, id).await?;
    // Admins edit their own clients' details; toggles and ordering are super admin only
    require_role(&auth, UserRole::Admin)?;
    if (request.feature_toggles.is_some() || request.display_order.is_some())
        && !auth.role().can_manage_clients()
    {
        return Err(AppError::Forbidden(
            "Only super admins can change features or ordering".to_string(),
        )
        .into());
    }
    validate_primary_color(request.primary_color.as_deref())?;

    let client = state
        .repos
        .clients
        .update(id, &request)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(Json(client))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 204, description = "Client and its assets deleted"),
        (status = 404, description = "Client not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id(), client_id = %id))]
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    require_client_admin(&auth)?;

    // Collect storage keys before the rows cascade away
    let assets = state.repos.assets.list_for_client(id, None).await?;
    let images = state.repos.inspiration.list_images_for_client(id).await?;

    if !state.repos.clients.delete(id).await? {
        return Err(AppError::NotFound("Client not found".to_string()).into());
    }

    for asset in &assets {
        if let Err(e) = state.converter.remove_renditions(asset).await {
            tracing::warn!(error = %e, asset_id = %asset.id, "Failed to remove renditions");
        }
    }
    let keys = assets
        .iter()
        .filter_map(|a| a.storage_key.clone())
        .chain(images.into_iter().map(|i| i.storage_key));
    for key in keys {
        if let Err(e) = state.storage.delete(&key).await {
            tracing::warn!(error = %e, storage_key = %key, "Failed to delete file from storage");
        }
    }

    tracing::info!(client_id = %id, assets = assets.len(), "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}/users",
    tag = "clients",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses((status = 200, description = "Members of the client", body = Vec<User>))
)]
pub async fn list_client_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<User>>, HttpAppError> {
    require_client(&state.repos, &auth, id).await?;

    let member_ids = state.repos.clients.list_member_ids(id).await?;
    let mut users = Vec::with_capacity(member_ids.len());
    for user_id in member_ids {
        if let Some(user) = state.repos.users.get(user_id).await? {
            users.push(user);
        }
    }
    Ok(Json(users))
}
