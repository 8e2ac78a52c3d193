//! Google Drive: OAuth connection per user, file browsing and SSE import.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Redirect,
    },
    Json,
};
use brandkit_core::models::UpsertGoogleDriveConnection;
use brandkit_core::AppError;
use brandkit_services::{import_files, DriveFile, ImportContext, ImportEvent, TokenResponse};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::constants::{IMPORT_EVENT_BUFFER, OAUTH_STATE_TTL_SECS};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::access::require_client;
use crate::utils::tokens::{sign_oauth_state, verify_oauth_state};

/// Refresh this long before Google's stated expiry
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GoogleStatusResponse {
    pub configured: bool,
    pub connected: bool,
    pub token_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    #[serde(rename = "folderId", default)]
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportRequest {
    pub file_ids: Vec<String>,
}

fn expires_at(tokens: &TokenResponse) -> Option<DateTime<Utc>> {
    tokens
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs))
}

/// Store tokens encrypted. Google omits the refresh token on re-consent, so keep the old one.
async fn store_tokens(
    state: &AppState,
    user_id: Uuid,
    tokens: &TokenResponse,
    previous_refresh: Option<String>,
) -> Result<(), AppError> {
    let cipher = state.integrations.encryption()?;
    let refresh_token = match tokens.refresh_token.as_deref() {
        Some(token) => Some(cipher.encrypt(token)?),
        None => previous_refresh,
    };
    state
        .repos
        .integrations
        .upsert_google_drive(UpsertGoogleDriveConnection {
            user_id,
            access_token: cipher.encrypt(&tokens.access_token)?,
            refresh_token,
            token_expires_at: expires_at(tokens),
        })
        .await?;
    Ok(())
}

/// A usable access token for the user, refreshing it when close to expiry
async fn access_token(state: &AppState, user_id: Uuid) -> Result<String, AppError> {
    let drive = state.integrations.google()?;
    let cipher = state.integrations.encryption()?;
    let connection = state
        .repos
        .integrations
        .get_google_drive(user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Google Drive is not connected".to_string()))?;

    let stale = connection
        .token_expires_at
        .is_some_and(|at| at <= Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS));
    if !stale {
        return cipher.decrypt(&connection.access_token);
    }

    let Some(encrypted_refresh) = connection.refresh_token else {
        return Err(AppError::InvalidOAuthToken(
            "Google Drive access expired; reconnect your account".to_string(),
        ));
    };
    let refreshed = drive.refresh(&cipher.decrypt(&encrypted_refresh)?).await?;
    store_tokens(state, user_id, &refreshed, Some(encrypted_refresh)).await?;
    tracing::debug!(user_id = %user_id, "Refreshed Google Drive token");
    Ok(refreshed.access_token)
}

#[utoipa::path(
    get,
    path = "/api/google/auth-url",
    tag = "google",
    responses(
        (status = 200, description = "Consent screen URL", body = AuthUrlResponse),
        (status = 400, description = "Google Drive is not configured", body = ErrorResponse)
    )
)]
pub async fn auth_url(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AuthUrlResponse>, HttpAppError> {
    let drive = state.integrations.google()?;
    let signed = sign_oauth_state(
        auth.user_id(),
        OAUTH_STATE_TTL_SECS,
        state.config.jwt_secret().as_bytes(),
    )?;
    Ok(Json(AuthUrlResponse {
        url: drive.authorization_url(&signed),
    }))
}

/// OAuth redirect target. Always sends the browser back to the frontend.
#[tracing::instrument(skip(state, query))]
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let frontend = state.config.frontend_url().trim_end_matches('/').to_string();
    match complete_oauth(&state, query).await {
        Ok(user_id) => {
            tracing::info!(user_id = %user_id, "Google Drive connected");
            Redirect::to(&format!("{}/settings/integrations?google=connected", frontend))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Google Drive connection failed");
            Redirect::to(&format!(
                "{}/settings/integrations?google=error&message={}",
                frontend,
                urlencoding::encode(&e.to_string())
            ))
        }
    }
}

async fn complete_oauth(state: &AppState, query: CallbackQuery) -> Result<Uuid, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::BadRequest(format!("Google declined access: {}", error)));
    }
    let signed = query
        .state
        .ok_or_else(|| AppError::BadRequest("Missing OAuth state".to_string()))?;
    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;
    let user_id = verify_oauth_state(&signed, state.config.jwt_secret().as_bytes())?;

    let tokens = state.integrations.google()?.exchange_code(&code).await?;
    let previous_refresh = state
        .repos
        .integrations
        .get_google_drive(user_id)
        .await?
        .and_then(|c| c.refresh_token);
    store_tokens(state, user_id, &tokens, previous_refresh).await?;
    Ok(user_id)
}

#[utoipa::path(
    get,
    path = "/api/google/status",
    tag = "google",
    responses((status = 200, description = "Connection status", body = GoogleStatusResponse))
)]
pub async fn status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<GoogleStatusResponse>, HttpAppError> {
    let connection = state
        .repos
        .integrations
        .get_google_drive(auth.user_id())
        .await?;
    Ok(Json(GoogleStatusResponse {
        configured: state.integrations.google.is_some(),
        connected: connection.is_some(),
        token_expires_at: connection.and_then(|c| c.token_expires_at),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/google/connection",
    tag = "google",
    responses((status = 204, description = "Disconnected"))
)]
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<StatusCode, HttpAppError> {
    state
        .repos
        .integrations
        .delete_google_drive(auth.user_id())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/google/files",
    tag = "google",
    params(("folderId" = Option<String>, Query, description = "Folder to list; root when absent")),
    responses(
        (status = 200, description = "Drive files, folders first"),
        (status = 401, description = "Google token rejected", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<FilesQuery>,
) -> Result<Json<Vec<DriveFile>>, HttpAppError> {
    let token = access_token(&state, auth.user_id()).await?;
    let files = state
        .integrations
        .google()?
        .list_files(&token, query.folder_id.as_deref())
        .await?;
    Ok(Json(files))
}

fn event_stream(
    receiver: mpsc::Receiver<ImportEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        let event = receiver.recv().await?;
        let sse = Event::default()
            .event(event.name())
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().event(event.name()));
        Some((Ok(sse), receiver))
    })
}

/// Import Drive files into a client, streaming progress as server-sent events
#[utoipa::path(
    post,
    path = "/api/clients/{client_id}/google/import",
    tag = "google",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    request_body = ImportRequest,
    responses(
        (status = 200, description = "text/event-stream of import events", content_type = "text/event-stream"),
        (status = 400, description = "No files or Drive not connected", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id(), client_id = %client_id))]
pub async fn import(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
    Json(request): Json<ImportRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpAppError> {
    require_client(&state.repos, &auth, client_id).await?;
    if !auth.role().can_upload() {
        return Err(AppError::Forbidden("Guests cannot import assets".to_string()).into());
    }
    if request.file_ids.is_empty() {
        return Err(AppError::InvalidInput("Select at least one file".to_string()).into());
    }

    let context = ImportContext {
        drive: state.integrations.google()?.clone(),
        storage: state.storage.clone(),
        assets: state.repos.assets.clone(),
        client_id,
        uploaded_by: auth.user_id(),
        access_token: access_token(&state, auth.user_id()).await?,
        max_file_size: state.config.max_upload_size_bytes() as u64,
    };

    let (sender, receiver) = mpsc::channel(IMPORT_EVENT_BUFFER);
    tokio::spawn(async move {
        let (imported, failed) = import_files(context, request.file_ids, sender).await;
        tracing::info!(client_id = %client_id, imported, failed, "Drive import finished");
    });

    Ok(Sse::new(event_stream(receiver)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn events_are_relayed_until_the_sender_closes() {
        let (sender, receiver) = mpsc::channel(4);
        sender.send(ImportEvent::Started { total: 1 }).await.unwrap();
        sender
            .send(ImportEvent::Completed { imported: 1, failed: 0 })
            .await
            .unwrap();
        drop(sender);

        let events: Vec<_> = event_stream(receiver).collect().await;
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn expiry_is_computed_from_expires_in() {
        let tokens = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
        };
        let at = expires_at(&tokens).unwrap();
        assert!(at > Utc::now() + Duration::seconds(3500));
    }
}
