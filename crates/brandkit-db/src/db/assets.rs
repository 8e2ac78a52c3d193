use async_trait::async_trait;
use brandkit_core::models::{
    AssetCategory, BrandAsset, ConvertedAsset, NewBrandAsset, NewConvertedAsset, PublicLink,
    UpdateAssetRequest,
};
use brandkit_core::AppError;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const ASSET_COLUMNS: &str = "id, client_id, name, category, visibility, data, file_name, \
     mime_type, file_size, storage_key, uploaded_by, created_at, updated_at";

const CONVERTED_COLUMNS: &str =
    "id, original_asset_id, format, is_dark_variant, storage_key, mime_type, file_size, created_at";

const LINK_COLUMNS: &str = "id, asset_id, client_id, token, created_by, expires_at, created_at";

/// Brand assets, their converted renditions and public share links
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn create(&self, asset: NewBrandAsset) -> Result<BrandAsset, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<BrandAsset>, AppError>;

    async fn list_for_client(
        &self,
        client_id: Uuid,
        category: Option<AssetCategory>,
    ) -> Result<Vec<BrandAsset>, AppError>;

    /// Case-insensitive name match within one client and category
    async fn find_by_name(
        &self,
        client_id: Uuid,
        category: AssetCategory,
        name: &str,
    ) -> Result<Option<BrandAsset>, AppError>;

    async fn update(
        &self,
        id: Uuid,
        request: &UpdateAssetRequest,
    ) -> Result<Option<BrandAsset>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Replaces any rendition with the same (asset, format, dark) triple
    async fn upsert_converted(
        &self,
        converted: NewConvertedAsset,
    ) -> Result<ConvertedAsset, AppError>;

    async fn get_converted(
        &self,
        asset_id: Uuid,
        format: &str,
        dark: bool,
    ) -> Result<Option<ConvertedAsset>, AppError>;

    async fn list_converted(&self, asset_id: Uuid) -> Result<Vec<ConvertedAsset>, AppError>;

    /// Returns the removed rows so callers can clean up storage
    async fn delete_converted_for_asset(
        &self,
        asset_id: Uuid,
    ) -> Result<Vec<ConvertedAsset>, AppError>;

    async fn create_public_link(
        &self,
        asset_id: Uuid,
        client_id: Uuid,
        token: &str,
        created_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PublicLink, AppError>;

    async fn get_public_link_by_token(&self, token: &str) -> Result<Option<PublicLink>, AppError>;

    async fn get_public_link(&self, id: Uuid) -> Result<Option<PublicLink>, AppError>;

    async fn list_public_links(&self, asset_id: Uuid) -> Result<Vec<PublicLink>, AppError>;

    async fn delete_public_link(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PostgresAssetRepository {
    pool: PgPool,
}

impl PostgresAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetRepository for PostgresAssetRepository {
    #[tracing::instrument(
        skip(self, asset),
        fields(db.table = "brand_assets", db.operation = "insert", db.record_id = %asset.id, client_id = %asset.client_id)
    )]
    async fn create(&self, asset: NewBrandAsset) -> Result<BrandAsset, AppError> {
        let created = sqlx::query_as::<Postgres, BrandAsset>(&format!(
            r#"
            INSERT INTO brand_assets (id, client_id, name, category, visibility, data, file_name,
                                      mime_type, file_size, storage_key, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(asset.id)
        .bind(asset.client_id)
        .bind(&asset.name)
        .bind(asset.category)
        .bind(asset.visibility)
        .bind(&asset.data)
        .bind(&asset.file_name)
        .bind(&asset.mime_type)
        .bind(asset.file_size)
        .bind(&asset.storage_key)
        .bind(asset.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(asset_id = %created.id, category = %created.category.as_str(), "Brand asset stored");

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "brand_assets", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<BrandAsset>, AppError> {
        let asset = sqlx::query_as::<Postgres, BrandAsset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM brand_assets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(asset)
    }

    #[tracing::instrument(skip(self), fields(db.table = "brand_assets", db.operation = "select", client_id = %client_id))]
    async fn list_for_client(
        &self,
        client_id: Uuid,
        category: Option<AssetCategory>,
    ) -> Result<Vec<BrandAsset>, AppError> {
        let assets = sqlx::query_as::<Postgres, BrandAsset>(&format!(
            r#"
            SELECT {ASSET_COLUMNS}
            FROM brand_assets
            WHERE client_id = $1 AND ($2::asset_category IS NULL OR category = $2)
            ORDER BY created_at ASC
            "#
        ))
        .bind(client_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(assets)
    }

    #[tracing::instrument(skip(self), fields(db.table = "brand_assets", db.operation = "select", client_id = %client_id))]
    async fn find_by_name(
        &self,
        client_id: Uuid,
        category: AssetCategory,
        name: &str,
    ) -> Result<Option<BrandAsset>, AppError> {
        let asset = sqlx::query_as::<Postgres, BrandAsset>(&format!(
            r#"
            SELECT {ASSET_COLUMNS}
            FROM brand_assets
            WHERE client_id = $1 AND category = $2 AND LOWER(name) = LOWER($3)
            ORDER BY created_at ASC
            LIMIT 1
            "#
        ))
        .bind(client_id)
        .bind(category)
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(asset)
    }

    #[tracing::instrument(skip(self, request), fields(db.table = "brand_assets", db.operation = "update", db.record_id = %id))]
    async fn update(
        &self,
        id: Uuid,
        request: &UpdateAssetRequest,
    ) -> Result<Option<BrandAsset>, AppError> {
        let asset = sqlx::query_as::<Postgres, BrandAsset>(&format!(
            r#"
            UPDATE brand_assets SET
                name = COALESCE($2, name),
                visibility = COALESCE($3, visibility),
                data = COALESCE($4, data),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.visibility)
        .bind(&request.data)
        .fetch_optional(&self.pool)
        .await?;

        Ok(asset)
    }

    #[tracing::instrument(skip(self), fields(db.table = "brand_assets", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM brand_assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(
        skip(self, converted),
        fields(db.table = "converted_assets", db.operation = "upsert", asset_id = %converted.original_asset_id, format = %converted.format)
    )]
    async fn upsert_converted(
        &self,
        converted: NewConvertedAsset,
    ) -> Result<ConvertedAsset, AppError> {
        let row = sqlx::query_as::<Postgres, ConvertedAsset>(&format!(
            r#"
            INSERT INTO converted_assets (original_asset_id, format, is_dark_variant, storage_key,
                                          mime_type, file_size)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (original_asset_id, format, is_dark_variant) DO UPDATE SET
                storage_key = EXCLUDED.storage_key,
                mime_type = EXCLUDED.mime_type,
                file_size = EXCLUDED.file_size,
                created_at = NOW()
            RETURNING {CONVERTED_COLUMNS}
            "#
        ))
        .bind(converted.original_asset_id)
        .bind(&converted.format)
        .bind(converted.is_dark_variant)
        .bind(&converted.storage_key)
        .bind(&converted.mime_type)
        .bind(converted.file_size)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "converted_assets", db.operation = "select"))]
    async fn get_converted(
        &self,
        asset_id: Uuid,
        format: &str,
        dark: bool,
    ) -> Result<Option<ConvertedAsset>, AppError> {
        let row = sqlx::query_as::<Postgres, ConvertedAsset>(&format!(
            r#"
            SELECT {CONVERTED_COLUMNS}
            FROM converted_assets
            WHERE original_asset_id = $1 AND format = $2 AND is_dark_variant = $3
            "#
        ))
        .bind(asset_id)
        .bind(format)
        .bind(dark)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "converted_assets", db.operation = "select"))]
    async fn list_converted(&self, asset_id: Uuid) -> Result<Vec<ConvertedAsset>, AppError> {
        let rows = sqlx::query_as::<Postgres, ConvertedAsset>(&format!(
            r#"
            SELECT {CONVERTED_COLUMNS}
            FROM converted_assets
            WHERE original_asset_id = $1
            ORDER BY format ASC, is_dark_variant ASC
            "#
        ))
        .bind(asset_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "converted_assets", db.operation = "delete"))]
    async fn delete_converted_for_asset(
        &self,
        asset_id: Uuid,
    ) -> Result<Vec<ConvertedAsset>, AppError> {
        let rows = sqlx::query_as::<Postgres, ConvertedAsset>(&format!(
            "DELETE FROM converted_assets WHERE original_asset_id = $1 RETURNING {CONVERTED_COLUMNS}"
        ))
        .bind(asset_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "public_links", db.operation = "insert", asset_id = %asset_id))]
    async fn create_public_link(
        &self,
        asset_id: Uuid,
        client_id: Uuid,
        token: &str,
        created_by: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PublicLink, AppError> {
        let link = sqlx::query_as::<Postgres, PublicLink>(&format!(
            r#"
            INSERT INTO public_links (asset_id, client_id, token, created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(asset_id)
        .bind(client_id)
        .bind(token)
        .bind(created_by)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(link)
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "public_links", db.operation = "select"))]
    async fn get_public_link_by_token(&self, token: &str) -> Result<Option<PublicLink>, AppError> {
        let link = sqlx::query_as::<Postgres, PublicLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM public_links WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    #[tracing::instrument(skip(self), fields(db.table = "public_links", db.operation = "select", db.record_id = %id))]
    async fn get_public_link(&self, id: Uuid) -> Result<Option<PublicLink>, AppError> {
        let link = sqlx::query_as::<Postgres, PublicLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM public_links WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    #[tracing::instrument(skip(self), fields(db.table = "public_links", db.operation = "select", asset_id = %asset_id))]
    async fn list_public_links(&self, asset_id: Uuid) -> Result<Vec<PublicLink>, AppError> {
        let links = sqlx::query_as::<Postgres, PublicLink>(&format!(
            "SELECT {LINK_COLUMNS} FROM public_links WHERE asset_id = $1 ORDER BY created_at DESC"
        ))
        .bind(asset_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    #[tracing::instrument(skip(self), fields(db.table = "public_links", db.operation = "delete", db.record_id = %id))]
    async fn delete_public_link(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM public_links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
