//! Asset file delivery and format conversion.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use brandkit_core::models::ConvertedAsset;
use brandkit_core::{AppError, AssetAction};
use brandkit_services::FileRequest;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::assets::load_scoped_asset;
use crate::state::AppState;
use crate::utils::client_scope::ClientScopeQuery;
use crate::utils::file_response::{serve_file, Disposition};

const FILE_CACHE_CONTROL: &str = "private, max-age=3600";

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    #[serde(rename = "clientId", default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// `dark` for the dark-background variant
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub size: Option<u32>,
    /// `1`/`true` to download instead of displaying inline
    #[serde(default)]
    pub download: Option<String>,
}

impl FileQuery {
    fn scope(&self) -> ClientScopeQuery {
        ClientScopeQuery {
            client_id: self.client_id.clone(),
        }
    }

    pub(crate) fn file_request(&self) -> Result<FileRequest, AppError> {
        let dark_variant = match self.variant.as_deref().map(str::trim) {
            None | Some("") | Some("light") | Some("default") => false,
            Some("dark") => true,
            Some(other) => {
                return Err(AppError::InvalidInput(format!(
                    "Unknown variant '{}'; expected 'dark' or 'light'",
                    other
                )))
            }
        };
        Ok(FileRequest {
            format: self
                .format
                .as_deref()
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty()),
            dark_variant,
            size: self.size,
        })
    }

    pub(crate) fn disposition(&self) -> Disposition {
        match self.download.as_deref() {
            Some("1") | Some("true") => Disposition::Attachment,
            _ => Disposition::Inline,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertRequest {
    /// Target formats, e.g. `["png", "svg"]` for logos or `["woff2"]` for fonts
    pub formats: Vec<String>,
    #[serde(default)]
    pub dark_variant: bool,
}

/// Stream an asset's file, converting on demand
#[utoipa::path(
    get,
    path = "/api/assets/{id}/file",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("clientId" = Uuid, Query, description = "Client that owns the asset"),
        ("format" = Option<String>, Query, description = "Target format (png, jpg, webp, svg, ttf, otf, woff, woff2)"),
        ("variant" = Option<String>, Query, description = "`dark` for the dark variant"),
        ("size" = Option<u32>, Query, description = "Edge length in pixels for raster logos")
    ),
    responses(
        (status = 200, description = "File contents"),
        (status = 400, description = "Missing clientId or unsupported format", body = ErrorResponse),
        (status = 403, description = "clientId mismatch or access denied", body = ErrorResponse),
        (status = 404, description = "Asset not found or has no file", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, query), fields(user_id = %auth.user_id(), asset_id = %id))]
pub async fn get_asset_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<FileQuery>,
) -> Result<Response, HttpAppError> {
    let asset = load_scoped_asset(&state, &auth, id, &query.scope(), AssetAction::Read).await?;
    let request = query.file_request()?;
    let served = state.converter.resolve(&asset, &request).await?;
    Ok(serve_file(
        state.storage.as_ref(),
        served,
        query.disposition(),
        FILE_CACHE_CONTROL,
    )
    .await?)
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/convert",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("clientId" = Uuid, Query, description = "Client that owns the asset")
    ),
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Renditions produced", body = Vec<ConvertedAsset>),
        (status = 400, description = "Unsupported format", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, scope, request), fields(user_id = %auth.user_id(), asset_id = %id))]
pub async fn convert_asset(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(scope): Query<ClientScopeQuery>,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<Vec<ConvertedAsset>>, HttpAppError> {
    let asset = load_scoped_asset(&state, &auth, id, &scope, AssetAction::Update).await?;
    if request.formats.is_empty() {
        return Err(AppError::InvalidInput("At least one format is required".to_string()).into());
    }
    let formats: Vec<String> = request
        .formats
        .iter()
        .map(|f| f.trim().to_lowercase())
        .collect();
    let converted = state
        .converter
        .convert_all(&asset, &formats, request.dark_variant)
        .await?;
    Ok(Json(converted))
}

#[utoipa::path(
    get,
    path = "/api/assets/{id}/converted",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("clientId" = Uuid, Query, description = "Client that owns the asset")
    ),
    responses((status = 200, description = "Cached renditions", body = Vec<ConvertedAsset>))
)]
pub async fn list_converted(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(scope): Query<ClientScopeQuery>,
) -> Result<Json<Vec<ConvertedAsset>>, HttpAppError> {
    let asset = load_scoped_asset(&state, &auth, id, &scope, AssetAction::Read).await?;
    Ok(Json(state.repos.assets.list_converted(asset.id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_variant_is_parsed() {
        let query = FileQuery {
            variant: Some("dark".to_string()),
            format: Some(" PNG ".to_string()),
            ..Default::default()
        };
        let request = query.file_request().unwrap();
        assert!(request.dark_variant);
        assert_eq!(request.format.as_deref(), Some("png"));
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let query = FileQuery {
            variant: Some("sepia".to_string()),
            ..Default::default()
        };
        assert!(query.file_request().is_err());
    }

    #[test]
    fn download_flag_switches_disposition() {
        let query = FileQuery {
            download: Some("1".to_string()),
            ..Default::default()
        };
        assert_eq!(query.disposition(), Disposition::Attachment);
        assert_eq!(FileQuery::default().disposition(), Disposition::Inline);
    }
}
