use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use brandkit_core::models::{
    Client, ConnectFigmaRequest, FigmaConnectionResponse, UpsertFigmaConnection, UserRole,
};
use brandkit_core::AppError;
use brandkit_services::sync_colors;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::access::{require_client, require_role};

#[derive(Debug, Serialize, ToSchema)]
pub struct FigmaSyncResponse {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

async fn figma_client(state: &AppState, auth: &AuthUser, client_id: Uuid) -> Result<Client, AppError> {
    let client = require_client(&state.repos, auth, client_id).await?;
    if !client.feature_toggles.figma_sync {
        return Err(AppError::Forbidden(
            "Figma sync is disabled for this client".to_string(),
        ));
    }
    Ok(client)
}

#[utoipa::path(
    put,
    path = "/api/clients/{client_id}/figma",
    tag = "figma",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    request_body = ConnectFigmaRequest,
    responses(
        (status = 200, description = "Figma file connected", body = FigmaConnectionResponse),
        (status = 403, description = "Figma sync disabled or caller below admin", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id(), client_id = %client_id))]
pub async fn connect(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ConnectFigmaRequest>,
) -> Result<Json<FigmaConnectionResponse>, HttpAppError> {
    figma_client(&state, &auth, client_id).await?;
    require_role(&auth, UserRole::Admin)?;

    let access_token = state
        .integrations
        .encryption()?
        .encrypt(request.access_token.trim())?;
    let connection = state
        .repos
        .integrations
        .upsert_figma(UpsertFigmaConnection {
            client_id,
            file_key: request.file_key.trim().to_string(),
            access_token,
        })
        .await?;
    Ok(Json(connection.into()))
}

#[utoipa::path(
    get,
    path = "/api/clients/{client_id}/figma",
    tag = "figma",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Connected Figma file", body = FigmaConnectionResponse),
        (status = 404, description = "No Figma file connected", body = ErrorResponse)
    )
)]
pub async fn get_connection(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<FigmaConnectionResponse>, HttpAppError> {
    require_client(&state.repos, &auth, client_id).await?;
    let connection = state
        .repos
        .integrations
        .get_figma(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No Figma file connected".to_string()))?;
    Ok(Json(connection.into()))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{client_id}/figma",
    tag = "figma",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    responses((status = 204, description = "Figma file disconnected"))
)]
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    require_client(&state.repos, &auth, client_id).await?;
    require_role(&auth, UserRole::Admin)?;
    if !state.repos.integrations.delete_figma(client_id).await? {
        return Err(AppError::NotFound("No Figma file connected".to_string()).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Pull color styles from the connected Figma file
#[utoipa::path(
    post,
    path = "/api/clients/{client_id}/figma/sync",
    tag = "figma",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Sync summary", body = FigmaSyncResponse),
        (status = 401, description = "Figma rejected the access token", body = ErrorResponse),
        (status = 404, description = "No Figma file connected", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id(), client_id = %client_id))]
pub async fn sync(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<FigmaSyncResponse>, HttpAppError> {
    figma_client(&state, &auth, client_id).await?;
    require_role(&auth, UserRole::Editor)?;

    let connection = state
        .repos
        .integrations
        .get_figma(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No Figma file connected".to_string()))?;
    let access_token = state
        .integrations
        .encryption()?
        .decrypt(&connection.access_token)?;

    let summary = sync_colors(
        &state.integrations.figma,
        state.repos.assets.as_ref(),
        client_id,
        &access_token,
        &connection.file_key,
        Some(auth.user_id()),
    )
    .await?;
    state.repos.integrations.mark_figma_synced(client_id).await?;

    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "Figma colors synced"
    );
    Ok(Json(FigmaSyncResponse {
        created: summary.created,
        updated: summary.updated,
        skipped: summary.skipped,
    }))
}
