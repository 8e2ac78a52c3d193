//! Slack slash commands, workspace registration and color swatches.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use brandkit_core::colors::parse_hex;
use brandkit_core::models::{
    Client, NewSlackWorkspace, RegisterSlackWorkspaceRequest, SlackWorkspaceResponse, UserRole,
};
use brandkit_core::AppError;
use brandkit_services::conversion::solid_swatch_png;
use brandkit_services::{verify_signature, SlackError, SlackMessage, SlashCommand};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::constants::SWATCH_SIZE;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::access::{require_client, require_role};

const SLACK_TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SLACK_SIGNATURE_HEADER: &str = "x-slack-signature";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn slack_client(state: &AppState, auth: &AuthUser, client_id: Uuid) -> Result<Client, AppError> {
    let client = require_client(&state.repos, auth, client_id).await?;
    require_role(auth, UserRole::Admin)?;
    Ok(client)
}

/// Slash command endpoint. Authenticated by Slack's request signature, not a session.
#[utoipa::path(
    post,
    path = "/api/slack/commands",
    tag = "slack",
    request_body(content = String, description = "Slack slash command form body", content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Block Kit response"),
        (status = 401, description = "Missing or invalid Slack signature", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body))]
pub async fn slash_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SlackMessage>, HttpAppError> {
    let secret = state
        .integrations
        .slack_signing_secret
        .as_deref()
        .ok_or_else(|| AppError::Internal("SLACK_SIGNING_SECRET is not configured".to_string()))?;

    let (Some(timestamp), Some(signature)) = (
        header_str(&headers, SLACK_TIMESTAMP_HEADER),
        header_str(&headers, SLACK_SIGNATURE_HEADER),
    ) else {
        return Err(SlackError::MissingHeaders.into());
    };
    verify_signature(secret, timestamp, &body, signature, Utc::now().timestamp())?;

    let command = SlashCommand::from_form_body(&body)?;
    // Slack shows non-200 responses as a generic failure, so errors become messages
    let message = match state.integrations.slack.handle(&command).await {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(error = %e, team_id = %command.team_id, "Slash command failed");
            SlackMessage::plain("Something went wrong looking up your brand. Please try again.")
        }
    };
    Ok(Json(message))
}

#[utoipa::path(
    post,
    path = "/api/clients/{client_id}/slack/workspaces",
    tag = "slack",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    request_body = RegisterSlackWorkspaceRequest,
    responses(
        (status = 201, description = "Workspace connected", body = SlackWorkspaceResponse),
        (status = 403, description = "Slack is disabled for this client or caller below admin", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id(), client_id = %client_id))]
pub async fn register_workspace(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RegisterSlackWorkspaceRequest>,
) -> Result<(StatusCode, Json<SlackWorkspaceResponse>), HttpAppError> {
    let client = slack_client(&state, &auth, client_id).await?;
    if !client.feature_toggles.slack_integration {
        return Err(AppError::Forbidden(
            "Slack integration is disabled for this client".to_string(),
        )
        .into());
    }

    let bot_token = match request.bot_token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => Some(state.integrations.encryption()?.encrypt(token)?),
        _ => None,
    };
    let workspace = state
        .repos
        .integrations
        .upsert_slack_workspace(NewSlackWorkspace {
            team_id: request.team_id.trim().to_string(),
            client_id,
            bot_token,
            created_by: auth.user_id(),
        })
        .await?;
    tracing::info!(team_id = %workspace.team_id, "Slack workspace connected");
    Ok((StatusCode::CREATED, Json(workspace.into())))
}

#[utoipa::path(
    get,
    path = "/api/clients/{client_id}/slack/workspaces",
    tag = "slack",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    responses((status = 200, description = "Connected workspaces", body = Vec<SlackWorkspaceResponse>))
)]
pub async fn list_workspaces(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<SlackWorkspaceResponse>>, HttpAppError> {
    slack_client(&state, &auth, client_id).await?;
    let workspaces = state
        .repos
        .integrations
        .list_slack_workspaces(client_id)
        .await?
        .into_iter()
        .map(SlackWorkspaceResponse::from)
        .collect();
    Ok(Json(workspaces))
}

#[utoipa::path(
    delete,
    path = "/api/slack/workspaces/{team_id}",
    tag = "slack",
    params(("team_id" = String, Path, description = "Slack team ID")),
    responses(
        (status = 204, description = "Workspace disconnected"),
        (status = 404, description = "Unknown workspace", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn delete_workspace(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(team_id): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    let workspace = state
        .repos
        .integrations
        .get_slack_workspace(&team_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Slack workspace not found".to_string()))?;
    slack_client(&state, &auth, workspace.client_id).await?;

    state
        .repos
        .integrations
        .delete_slack_workspace(&team_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Solid PNG used as the image accessory of color blocks
#[utoipa::path(
    get,
    path = "/api/slack/swatch/{hex}",
    tag = "slack",
    params(("hex" = String, Path, description = "Hex color, with or without '#' or '.png'")),
    responses(
        (status = 200, description = "PNG swatch", content_type = "image/png"),
        (status = 400, description = "Invalid hex color", body = ErrorResponse)
    )
)]
pub async fn swatch(Path(hex): Path<String>) -> Result<Response, HttpAppError> {
    let raw = hex.trim().trim_end_matches(".png");
    let rgb = parse_hex(raw)?;
    let png = solid_swatch_png(rgb.r, rgb.g, rgb.b, SWATCH_SIZE)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=86400, immutable"),
        ],
        png,
    )
        .into_response())
}
