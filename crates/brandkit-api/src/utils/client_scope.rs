//! Every asset URL carries the owning client's id (`?clientId=`). Requests
//! without it are rejected before touching storage, and the id must match
//! the asset so a URL cannot be replayed against another tenant's path.

use brandkit_core::models::BrandAsset;
use brandkit_core::AppError;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ClientScopeQuery {
    #[serde(rename = "clientId", default)]
    pub client_id: Option<String>,
}

impl ClientScopeQuery {
    /// Missing or malformed `clientId` is a 400
    pub fn require(&self) -> Result<Uuid, AppError> {
        let raw = self
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::BadRequest("clientId query parameter is required".to_string())
            })?;
        Uuid::parse_str(raw)
            .map_err(|_| AppError::BadRequest("clientId must be a valid UUID".to_string()))
    }
}

/// A `clientId` that does not own the asset is a 403
pub fn ensure_asset_in_client(asset: &BrandAsset, client_id: Uuid) -> Result<(), AppError> {
    if asset.client_id == client_id {
        Ok(())
    } else {
        tracing::warn!(
            asset_id = %asset.id,
            asset_client_id = %asset.client_id,
            requested_client_id = %client_id,
            "Asset requested under another client"
        );
        Err(AppError::Forbidden(
            "Asset does not belong to the requested client".to_string(),
        ))
    }
}

/// Client-scoped URL the frontend uses to fetch an asset's file
pub fn asset_file_path(asset_id: Uuid, client_id: Uuid) -> String {
    format!("/api/assets/{}/file?clientId={}", asset_id, client_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_client_id_is_bad_request() {
        for query in [
            ClientScopeQuery { client_id: None },
            ClientScopeQuery {
                client_id: Some("  ".to_string()),
            },
        ] {
            assert!(matches!(query.require(), Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn malformed_client_id_is_bad_request() {
        let query = ClientScopeQuery {
            client_id: Some("acme".to_string()),
        };
        assert!(matches!(query.require(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn file_path_always_carries_client_id() {
        let (asset, client) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(
            asset_file_path(asset, client),
            format!("/api/assets/{}/file?clientId={}", asset, client)
        );
    }
}
