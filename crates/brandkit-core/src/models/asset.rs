use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Kind of brand asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "asset_category", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Logo,
    Color,
    Font,
    Other,
}

impl AssetCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetCategory::Logo => "logo",
            AssetCategory::Color => "color",
            AssetCategory::Font => "font",
            AssetCategory::Other => "other",
        }
    }

    /// Classify an uploaded file by content type, falling back to the extension.
    pub fn from_mime(mime_type: &str, file_name: &str) -> Self {
        let mime = mime_type.to_lowercase();
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if mime.starts_with("image/") {
            AssetCategory::Logo
        } else if mime.starts_with("font/")
            || mime.contains("font")
            || matches!(ext.as_str(), "ttf" | "otf" | "woff" | "woff2" | "eot")
        {
            AssetCategory::Font
        } else {
            AssetCategory::Other
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "logo" | "logos" => Ok(AssetCategory::Logo),
            "color" | "colors" => Ok(AssetCategory::Color),
            "font" | "fonts" | "typography" => Ok(AssetCategory::Font),
            "other" => Ok(AssetCategory::Other),
            other => Err(format!("Unknown asset category: {}", other)),
        }
    }
}

/// Asset visibility inside its client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "asset_visibility", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Owner and admins only
    Private,
    /// Every member of the client, guests included
    #[default]
    Shared,
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "shared" => Ok(Visibility::Shared),
            other => Err(format!("Unknown visibility: {}", other)),
        }
    }
}

/// Brand asset row. Colors carry no file, so the file columns are optional.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BrandAsset {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub category: AssetCategory,
    pub visibility: Visibility,
    #[schema(value_type = Object)]
    pub data: JsonValue,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    #[serde(skip_serializing)]
    pub storage_key: Option<String>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BrandAsset {
    pub fn has_file(&self) -> bool {
        self.storage_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewBrandAsset {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub category: AssetCategory,
    pub visibility: Visibility,
    pub data: JsonValue,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub storage_key: Option<String>,
    pub uploaded_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateAssetRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Asset name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub data: Option<JsonValue>,
}

/// Asset as returned to the frontend, with its client-scoped file URL
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssetResponse {
    #[serde(flatten)]
    pub asset: BrandAsset,
    pub file_url: Option<String>,
}

/// Cached conversion of an asset into another format
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ConvertedAsset {
    pub id: Uuid,
    pub original_asset_id: Uuid,
    pub format: String,
    pub is_dark_variant: bool,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub mime_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewConvertedAsset {
    pub original_asset_id: Uuid,
    pub format: String,
    pub is_dark_variant: bool,
    pub storage_key: String,
    pub mime_type: String,
    pub file_size: i64,
}

/// Unauthenticated share link for a single asset
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PublicLink {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub client_id: Uuid,
    pub token: String,
    pub created_by: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PublicLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreatePublicLinkRequest {
    /// Lifetime in hours; absent means the link never expires
    #[serde(default)]
    #[validate(range(min = 1, max = 8760))]
    pub expires_in_hours: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicLinkResponse {
    #[serde(flatten)]
    pub link: PublicLink,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn category_from_mime() {
        assert_eq!(AssetCategory::from_mime("image/svg+xml", "logo.svg"), AssetCategory::Logo);
        assert_eq!(AssetCategory::from_mime("font/woff2", "brand.woff2"), AssetCategory::Font);
        assert_eq!(
            AssetCategory::from_mime("application/octet-stream", "Brand-Bold.OTF"),
            AssetCategory::Font
        );
        assert_eq!(AssetCategory::from_mime("application/pdf", "guide.pdf"), AssetCategory::Other);
    }

    #[test]
    fn visibility_defaults_to_shared() {
        assert_eq!(Visibility::default(), Visibility::Shared);
    }

    #[test]
    fn public_link_expiry() {
        let now = Utc::now();
        let mut link = PublicLink {
            id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            token: "t".to_string(),
            created_by: Uuid::new_v4(),
            expires_at: None,
            created_at: now,
        };
        assert!(!link.is_expired(now));
        link.expires_at = Some(now - Duration::minutes(1));
        assert!(link.is_expired(now));
    }
}
