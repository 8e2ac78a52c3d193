use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Labelled mood-board section of a client's inspiration page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InspirationSection {
    pub id: Uuid,
    pub client_id: Uuid,
    pub label: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InspirationImage {
    pub id: Uuid,
    pub section_id: Uuid,
    pub client_id: Uuid,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInspirationImage {
    pub id: Uuid,
    pub section_id: Uuid,
    pub client_id: Uuid,
    pub storage_key: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateSectionRequest {
    #[validate(length(min = 1, max = 255, message = "Section label must be between 1 and 255 characters"))]
    pub label: String,
    #[serde(default)]
    pub display_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateSectionRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Section label must be between 1 and 255 characters"))]
    pub label: Option<String>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

/// A section together with its images, in display order
#[derive(Debug, Serialize, ToSchema)]
pub struct SectionWithImages {
    #[serde(flatten)]
    pub section: InspirationSection,
    pub images: Vec<InspirationImageResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InspirationImageResponse {
    #[serde(flatten)]
    pub image: InspirationImage,
    pub file_url: String,
}
