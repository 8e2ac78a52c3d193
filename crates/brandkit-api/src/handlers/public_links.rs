//! Shareable, unauthenticated links to a single asset file.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use brandkit_core::models::{CreatePublicLinkRequest, PublicLink, PublicLinkResponse};
use brandkit_core::{AppError, AssetAction};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::assets::load_scoped_asset;
use crate::handlers::files::FileQuery;
use crate::middleware::audit;
use crate::state::AppState;
use crate::utils::access::authorize_asset;
use crate::utils::client_scope::ClientScopeQuery;
use crate::utils::file_response::serve_file;
use crate::utils::tokens::random_token;

const PUBLIC_CACHE_CONTROL: &str = "public, max-age=300";

fn link_response(state: &AppState, link: PublicLink) -> PublicLinkResponse {
    let url = format!(
        "{}/api/public/{}",
        state.config.public_base_url().trim_end_matches('/'),
        link.token
    );
    PublicLinkResponse { link, url }
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/public-links",
    tag = "public-links",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("clientId" = Uuid, Query, description = "Client that owns the asset")
    ),
    request_body = CreatePublicLinkRequest,
    responses(
        (status = 201, description = "Link created", body = PublicLinkResponse),
        (status = 403, description = "Guests and non-owners cannot share", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, scope, request), fields(user_id = %auth.user_id(), asset_id = %id))]
pub async fn create_public_link(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(scope): Query<ClientScopeQuery>,
    ValidatedJson(request): ValidatedJson<CreatePublicLinkRequest>,
) -> Result<(StatusCode, Json<PublicLinkResponse>), HttpAppError> {
    let asset = load_scoped_asset(&state, &auth, id, &scope, AssetAction::Share).await?;
    if !asset.has_file() {
        return Err(AppError::InvalidInput(
            "Only assets with a file can be shared publicly".to_string(),
        )
        .into());
    }

    let expires_at = request
        .expires_in_hours
        .map(|hours| Utc::now() + Duration::hours(hours));
    let link = state
        .repos
        .assets
        .create_public_link(
            asset.id,
            asset.client_id,
            &random_token(),
            auth.user_id(),
            expires_at,
        )
        .await?;
    audit::log_public_link("created", Some(auth.user_id()), link.id, asset.id);

    Ok((StatusCode::CREATED, Json(link_response(&state, link))))
}

#[utoipa::path(
    get,
    path = "/api/assets/{id}/public-links",
    tag = "public-links",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("clientId" = Uuid, Query, description = "Client that owns the asset")
    ),
    responses((status = 200, description = "Links for the asset", body = Vec<PublicLinkResponse>))
)]
pub async fn list_public_links(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(scope): Query<ClientScopeQuery>,
) -> Result<Json<Vec<PublicLinkResponse>>, HttpAppError> {
    let asset = load_scoped_asset(&state, &auth, id, &scope, AssetAction::Share).await?;
    let links = state
        .repos
        .assets
        .list_public_links(asset.id)
        .await?
        .into_iter()
        .map(|link| link_response(&state, link))
        .collect();
    Ok(Json(links))
}

#[utoipa::path(
    delete,
    path = "/api/public-links/{id}",
    tag = "public-links",
    params(("id" = Uuid, Path, description = "Public link ID")),
    responses(
        (status = 204, description = "Link revoked"),
        (status = 404, description = "Link not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id(), link_id = %id))]
pub async fn delete_public_link(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    let link = state
        .repos
        .assets
        .get_public_link(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Public link not found".to_string()))?;
    let asset = state.repos.assets.get(link.asset_id).await?;
    authorize_asset(&auth, asset, AssetAction::Share)?;

    state.repos.assets.delete_public_link(id).await?;
    audit::log_public_link("revoked", Some(auth.user_id()), id, link.asset_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Serve the file behind a public link. No session required.
#[utoipa::path(
    get,
    path = "/api/public/{token}",
    tag = "public-links",
    params(("token" = String, Path, description = "Public link token")),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "Unknown link", body = ErrorResponse),
        (status = 410, description = "Link expired", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, token, query))]
pub async fn serve_public_link(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, HttpAppError> {
    let link = state
        .repos
        .assets
        .get_public_link_by_token(&token)
        .await?
        .ok_or_else(|| AppError::NotFound("Link not found".to_string()))?;
    if link.is_expired(Utc::now()) {
        return Err(AppError::Gone("This link has expired".to_string()).into());
    }

    let asset = state
        .repos
        .assets
        .get(link.asset_id)
        .await?
        .filter(|asset| asset.client_id == link.client_id)
        .ok_or_else(|| AppError::NotFound("Link not found".to_string()))?;

    let served = state.converter.resolve(&asset, &query.file_request()?).await?;
    audit::log_public_link("accessed", None, link.id, asset.id);
    Ok(serve_file(
        state.storage.as_ref(),
        served,
        query.disposition(),
        PUBLIC_CACHE_CONTROL,
    )
    .await?)
}
