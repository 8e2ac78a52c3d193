//! Brand asset CRUD. Every `/api/assets/{id}` route is scoped by `?clientId=`.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use brandkit_core::colors::CreateColorRequest;
use brandkit_core::models::{
    AssetCategory, AssetResponse, BrandAsset, NewBrandAsset, UpdateAssetRequest, Visibility,
};
use brandkit_core::{check_asset_permission, AppError, AssetAction, ColorData};
use brandkit_storage::keys;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::access::{authorize_asset, require_client};
use crate::utils::client_scope::{asset_file_path, ensure_asset_in_client, ClientScopeQuery};
use crate::utils::upload::read_upload_form;

#[derive(Debug, Deserialize)]
pub struct AssetListQuery {
    #[serde(default)]
    pub category: Option<String>,
}

pub(crate) fn asset_response(asset: BrandAsset) -> AssetResponse {
    let file_url = asset
        .has_file()
        .then(|| asset_file_path(asset.id, asset.client_id));
    AssetResponse { asset, file_url }
}

/// Resolve `/api/assets/{id}?clientId=` to an asset the caller may act on.
/// Missing `clientId` fails before any lookup; a foreign one is a 403.
pub(crate) async fn load_scoped_asset(
    state: &AppState,
    auth: &AuthUser,
    asset_id: Uuid,
    scope: &ClientScopeQuery,
    action: AssetAction,
) -> Result<BrandAsset, AppError> {
    let client_id = scope.require()?;
    let asset = state
        .repos
        .assets
        .get(asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    ensure_asset_in_client(&asset, client_id)?;
    authorize_asset(auth, Some(asset), action)
}

fn require_upload_role(auth: &AuthUser) -> Result<(), AppError> {
    if auth.role().can_upload() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Guests cannot add assets".to_string(),
        ))
    }
}

#[utoipa::path(
    get,
    path = "/api/clients/{client_id}/assets",
    tag = "assets",
    params(
        ("client_id" = Uuid, Path, description = "Client ID"),
        ("category" = Option<String>, Query, description = "logo, color, font or other")
    ),
    responses(
        (status = 200, description = "Assets the caller can read", body = Vec<AssetResponse>),
        (status = 403, description = "Not a member of the client", body = ErrorResponse)
    )
)]
pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
    Query(query): Query<AssetListQuery>,
) -> Result<Json<Vec<AssetResponse>>, HttpAppError> {
    require_client(&state.repos, &auth, client_id).await?;
    let category = query
        .category
        .as_deref()
        .map(str::parse::<AssetCategory>)
        .transpose()
        .map_err(AppError::InvalidInput)?;

    let assets = state
        .repos
        .assets
        .list_for_client(client_id, category)
        .await?
        .into_iter()
        .filter(|asset| check_asset_permission(&auth.actor, Some(asset), AssetAction::Read).allowed)
        .map(asset_response)
        .collect();
    Ok(Json(assets))
}

/// Upload a logo, font or other file as a new asset
#[utoipa::path(
    post,
    path = "/api/clients/{client_id}/assets",
    tag = "assets",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    request_body(content = String, description = "Multipart form: file, name, category, visibility, data", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Asset created", body = AssetResponse),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, multipart), fields(user_id = %auth.user_id(), client_id = %client_id))]
pub async fn upload_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AssetResponse>), HttpAppError> {
    require_client(&state.repos, &auth, client_id).await?;
    require_upload_role(&auth)?;

    let mut form = read_upload_form(multipart, state.config.max_upload_size_bytes()).await?;
    let file = form.require_file()?;

    let category = match form.field("category") {
        Some(raw) => raw.parse::<AssetCategory>().map_err(AppError::InvalidInput)?,
        None => AssetCategory::from_mime(&file.content_type, &file.file_name),
    };
    if category == AssetCategory::Color {
        return Err(AppError::InvalidInput(
            "Colors are created from a hex value, not a file upload".to_string(),
        )
        .into());
    }
    let visibility = form
        .field("visibility")
        .map(str::parse::<Visibility>)
        .transpose()
        .map_err(AppError::InvalidInput)?
        .unwrap_or_default();
    let data = match form.field("data") {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::InvalidInput(format!("data must be JSON: {}", e)))?,
        None => json!({}),
    };
    let name = form
        .field("name")
        .map(str::to_string)
        .unwrap_or_else(|| {
            file.file_name
                .rsplit_once('.')
                .map(|(stem, _)| stem.to_string())
                .unwrap_or_else(|| file.file_name.clone())
        });
    if name.len() > 255 {
        return Err(AppError::InvalidInput(
            "Asset name must be between 1 and 255 characters".to_string(),
        )
        .into());
    }

    let asset_id = Uuid::new_v4();
    let storage_key = keys::asset_key(client_id, asset_id, &file.file_name);
    let file_size = file.data.len() as i64;
    state
        .storage
        .upload(&storage_key, file.data, &file.content_type)
        .await?;

    let created = state
        .repos
        .assets
        .create(NewBrandAsset {
            id: asset_id,
            client_id,
            name,
            category,
            visibility,
            data,
            file_name: Some(file.file_name),
            mime_type: Some(file.content_type),
            file_size: Some(file_size),
            storage_key: Some(storage_key.clone()),
            uploaded_by: Some(auth.user_id()),
        })
        .await;

    let asset = match created {
        Ok(asset) => asset,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&storage_key).await {
                tracing::warn!(error = %cleanup, storage_key = %storage_key, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    tracing::info!(asset_id = %asset.id, category = %asset.category, "Asset uploaded");
    Ok((StatusCode::CREATED, Json(asset_response(asset))))
}

#[utoipa::path(
    post,
    path = "/api/clients/{client_id}/colors",
    tag = "assets",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    request_body = CreateColorRequest,
    responses(
        (status = 201, description = "Color asset created", body = AssetResponse),
        (status = 400, description = "Invalid hex value", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id(), client_id = %client_id))]
pub async fn create_color(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateColorRequest>,
) -> Result<(StatusCode, Json<AssetResponse>), HttpAppError> {
    require_client(&state.repos, &auth, client_id).await?;
    require_upload_role(&auth)?;

    let color = ColorData::from_hex(&request.name, &request.hex, request.color_type)?;
    let asset = state
        .repos
        .assets
        .create(NewBrandAsset {
            id: Uuid::new_v4(),
            client_id,
            name: color.name.clone(),
            category: AssetCategory::Color,
            visibility: request.visibility,
            data: color.to_json(),
            file_name: None,
            mime_type: None,
            file_size: None,
            storage_key: None,
            uploaded_by: Some(auth.user_id()),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(asset_response(asset))))
}

#[utoipa::path(
    get,
    path = "/api/assets/{id}",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("clientId" = Uuid, Query, description = "Client that owns the asset")
    ),
    responses(
        (status = 200, description = "Asset", body = AssetResponse),
        (status = 400, description = "Missing clientId", body = ErrorResponse),
        (status = 403, description = "clientId mismatch or access denied", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    )
)]
pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(scope): Query<ClientScopeQuery>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let asset = load_scoped_asset(&state, &auth, id, &scope, AssetAction::Read).await?;
    Ok(Json(asset_response(asset)))
}

#[utoipa::path(
    patch,
    path = "/api/assets/{id}",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("clientId" = Uuid, Query, description = "Client that owns the asset")
    ),
    request_body = UpdateAssetRequest,
    responses((status = 200, description = "Asset updated", body = AssetResponse))
)]
#[tracing::instrument(skip(state, auth, scope, request), fields(user_id = %auth.user_id(), asset_id = %id))]
pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(scope): Query<ClientScopeQuery>,
    ValidatedJson(mut request): ValidatedJson<UpdateAssetRequest>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let asset = load_scoped_asset(&state, &auth, id, &scope, AssetAction::Update).await?;

    // Color payloads are normalized so every representation stays in sync
    if asset.category == AssetCategory::Color {
        if let Some(data) = request.data.take() {
            let name = request.name.as_deref().unwrap_or(&asset.name);
            let color = ColorData::from_asset_data(name, &data).ok_or_else(|| {
                AppError::InvalidInput("Color data must include a valid hex value".to_string())
            })?;
            request.data = Some(color.to_json());
        }
    }

    let updated = state
        .repos
        .assets
        .update(id, &request)
        .await?
        .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
    Ok(Json(asset_response(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/assets/{id}",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("clientId" = Uuid, Query, description = "Client that owns the asset")
    ),
    responses((status = 204, description = "Asset, renditions and files deleted"))
)]
#[tracing::instrument(skip(state, auth, scope), fields(user_id = %auth.user_id(), asset_id = %id))]
pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(scope): Query<ClientScopeQuery>,
) -> Result<StatusCode, HttpAppError> {
    let asset = load_scoped_asset(&state, &auth, id, &scope, AssetAction::Delete).await?;

    let renditions = state.converter.remove_renditions(&asset).await?;
    if !state.repos.assets.delete(id).await? {
        return Err(AppError::NotFound("Asset not found".to_string()).into());
    }
    if let Some(key) = asset.storage_key.as_deref() {
        if let Err(e) = state.storage.delete(key).await {
            tracing::warn!(error = %e, storage_key = %key, "Failed to delete asset file from storage");
        }
    }

    tracing::info!(asset_id = %id, renditions, "Asset deleted");
    Ok(StatusCode::NO_CONTENT)
}
