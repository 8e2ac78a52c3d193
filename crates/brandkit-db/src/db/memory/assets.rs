use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brandkit_core::models::{
    AssetCategory, BrandAsset, ConvertedAsset, NewBrandAsset, NewConvertedAsset, PublicLink,
    UpdateAssetRequest,
};
use brandkit_core::AppError;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::already_exists;
use crate::db::AssetRepository;

#[derive(Default)]
struct State {
    assets: HashMap<Uuid, BrandAsset>,
    converted: HashMap<Uuid, ConvertedAsset>,
    links: HashMap<Uuid, PublicLink>,
}

#[derive(Clone, Default)]
pub struct InMemoryAssetRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn create(&self, asset: NewBrandAsset) -> Result<BrandAsset, AppError> {
        let mut state = self.state.write().await;
        if state.assets.contains_key(&asset.id) {
            return Err(already_exists());
        }
        let now = Utc::now();
        let created = BrandAsset {
            id: asset.id,
            client_id: asset.client_id,
            name: asset.name,
            category: asset.category,
            visibility: asset.visibility,
            data: asset.data,
            file_name: asset.file_name,
            mime_type: asset.mime_type,
            file_size: asset.file_size,
            storage_key: asset.storage_key,
            uploaded_by: asset.uploaded_by,
            created_at: now,
            updated_at: now,
        };
        state.assets.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<BrandAsset>, AppError> {
        Ok(self.state.read().await.assets.get(&id).cloned())
    }

    async fn list_for_client(
        &self,
        client_id: Uuid,
        category: Option<AssetCategory>,
    ) -> Result<Vec<BrandAsset>, AppError> {
        let state = self.state.read().await;
        let mut assets: Vec<BrandAsset> = state
            .assets
            .values()
            .filter(|a| a.client_id == client_id)
            .filter(|a| category.is_none_or(|c| a.category == c))
            .cloned()
            .collect();
        assets.sort_by_key(|a| a.created_at);
        Ok(assets)
    }

    async fn find_by_name(
        &self,
        client_id: Uuid,
        category: AssetCategory,
        name: &str,
    ) -> Result<Option<BrandAsset>, AppError> {
        let name = name.trim();
        let state = self.state.read().await;
        Ok(state
            .assets
            .values()
            .filter(|a| {
                a.client_id == client_id
                    && a.category == category
                    && a.name.eq_ignore_ascii_case(name)
            })
            .min_by_key(|a| a.created_at)
            .cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        request: &UpdateAssetRequest,
    ) -> Result<Option<BrandAsset>, AppError> {
        let mut state = self.state.write().await;
        let Some(asset) = state.assets.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &request.name {
            asset.name = name.trim().to_string();
        }
        if let Some(visibility) = request.visibility {
            asset.visibility = visibility;
        }
        if let Some(data) = &request.data {
            asset.data = data.clone();
        }
        asset.updated_at = Utc::now();
        Ok(Some(asset.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        state.converted.retain(|_, c| c.original_asset_id != id);
        state.links.retain(|_, l| l.asset_id != id);
        Ok(state.assets.remove(&id).is_some())
    }

    async fn upsert_converted(
        &self,
        converted: NewConvertedAsset,
    ) -> Result<ConvertedAsset, AppError> {
        let mut state = self.state.write().await;
        if !state.assets.contains_key(&converted.original_asset_id) {
            return Err(AppError::NotFound("Asset not found".to_string()));
        }
        let existing = state.converted.values().find(|c| {
            c.original_asset_id == converted.original_asset_id
                && c.format == converted.format
                && c.is_dark_variant == converted.is_dark_variant
        });
        let row = ConvertedAsset {
            id: existing.map(|c| c.id).unwrap_or_else(Uuid::new_v4),
            original_asset_id: converted.original_asset_id,
            format: converted.format,
            is_dark_variant: converted.is_dark_variant,
            storage_key: converted.storage_key,
            mime_type: converted.mime_type,
            file_size: converted.file_size,
            created_at: Utc::now(),
        };
        state.converted.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_converted(
        &self,
        asset_id: Uuid,
        format: &str,
        dark: bool,
    ) -> Result<Option<ConvertedAsset>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .converted
            .values()
            .find(|c| {
                c.original_asset_id == asset_id && c.format == format && c.is_dark_variant == dark
            })
            .cloned())
    }

    async fn list_converted(&self, asset_id: Uuid) -> Result<Vec<ConvertedAsset>, AppError> {
        let mut rows: Vec<ConvertedAsset> = self
            .state
            .read()
            .await
            .converted
            .values()
            .filter(|c| c.original_asset_id == asset_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.format
                .cmp(&b.format)
                .then(a.is_dark_variant.cmp(&b.is_dark_variant))
        });
        Ok(rows)
    }

    async fn delete_converted_for_asset(
        &self,
        asset_id: Uuid,
    ) -> Result<Vec<ConvertedAsset>, AppError> {
        let mut state = self.state.write().await;
        let ids: Vec<Uuid> = state
            .converted
            .values()
            .filter(|c| c.original_asset_id == asset_id)
            .map(|c| c.id)
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| state.converted.remove(&id))
            .collect())
    }

    async fn create_public_link(
        &self,
        asset_id: Uuid,
        client_id: Uuid,
        token: &str,
        created_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PublicLink, AppError> {
        let mut state = self.state.write().await;
        if state.links.values().any(|l| l.token == token) {
            return Err(already_exists());
        }
        let link = PublicLink {
            id: Uuid::new_v4(),
            asset_id,
            client_id,
            token: token.to_string(),
            created_by,
            expires_at,
            created_at: Utc::now(),
        };
        state.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn get_public_link_by_token(&self, token: &str) -> Result<Option<PublicLink>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .links
            .values()
            .find(|l| l.token == token)
            .cloned())
    }

    async fn get_public_link(&self, id: Uuid) -> Result<Option<PublicLink>, AppError> {
        Ok(self.state.read().await.links.get(&id).cloned())
    }

    async fn list_public_links(&self, asset_id: Uuid) -> Result<Vec<PublicLink>, AppError> {
        let mut links: Vec<PublicLink> = self
            .state
            .read()
            .await
            .links
            .values()
            .filter(|l| l.asset_id == asset_id)
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }

    async fn delete_public_link(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.state.write().await.links.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandkit_core::models::Visibility;
    use serde_json::json;

    fn logo(client_id: Uuid, name: &str) -> NewBrandAsset {
        let id = Uuid::new_v4();
        NewBrandAsset {
            id,
            client_id,
            name: name.to_string(),
            category: AssetCategory::Logo,
            visibility: Visibility::Shared,
            data: json!({}),
            file_name: Some("logo.png".to_string()),
            mime_type: Some("image/png".to_string()),
            file_size: Some(10),
            storage_key: Some(format!("clients/{client_id}/assets/{id}/logo.png")),
            uploaded_by: None,
        }
    }

    fn rendition(asset_id: Uuid, format: &str, key: &str) -> NewConvertedAsset {
        NewConvertedAsset {
            original_asset_id: asset_id,
            format: format.to_string(),
            is_dark_variant: false,
            storage_key: key.to_string(),
            mime_type: "image/png".to_string(),
            file_size: 5,
        }
    }

    #[tokio::test]
    async fn upsert_converted_replaces_same_rendition() {
        let repo = InMemoryAssetRepository::default();
        let asset = repo.create(logo(Uuid::new_v4(), "Primary")).await.unwrap();

        let first = repo
            .upsert_converted(rendition(asset.id, "png", "a"))
            .await
            .unwrap();
        let second = repo
            .upsert_converted(rendition(asset.id, "png", "b"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let all = repo.list_converted(asset.id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].storage_key, "b");
    }

    #[tokio::test]
    async fn deleting_asset_cascades_renditions_and_links() {
        let repo = InMemoryAssetRepository::default();
        let asset = repo.create(logo(Uuid::new_v4(), "Primary")).await.unwrap();
        repo.upsert_converted(rendition(asset.id, "webp", "k"))
            .await
            .unwrap();
        let link = repo
            .create_public_link(asset.id, asset.client_id, "tok", Uuid::new_v4(), None)
            .await
            .unwrap();

        assert!(repo.delete(asset.id).await.unwrap());
        assert!(repo.list_converted(asset.id).await.unwrap().is_empty());
        assert!(repo.get_public_link(link.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_name_ignores_case_and_scopes_to_client() {
        let repo = InMemoryAssetRepository::default();
        let client = Uuid::new_v4();
        repo.create(logo(client, "Primary Logo")).await.unwrap();

        let hit = repo
            .find_by_name(client, AssetCategory::Logo, "primary logo")
            .await
            .unwrap();
        assert!(hit.is_some());

        let other_client = repo
            .find_by_name(Uuid::new_v4(), AssetCategory::Logo, "primary logo")
            .await
            .unwrap();
        assert!(other_client.is_none());
    }
}
