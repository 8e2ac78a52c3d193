use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Per-client switches for the brand sections shown to members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct FeatureToggles {
    pub logo_system: bool,
    pub color_system: bool,
    pub type_system: bool,
    pub inspiration: bool,
    pub figma_sync: bool,
    pub slack_integration: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            logo_system: true,
            color_system: true,
            type_system: true,
            inspiration: true,
            figma_sync: false,
            slack_integration: false,
        }
    }
}

/// A brand account; every asset is scoped to exactly one client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub primary_color: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub feature_toggles: FeatureToggles,
    pub display_order: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 255, message = "Client name must be between 1 and 255 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub feature_toggles: Option<FeatureToggles>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateClientRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Client name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub feature_toggles: Option<FeatureToggles>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_toggles_fall_back_to_defaults() {
        let toggles: FeatureToggles = serde_json::from_str(r#"{"figma_sync": true}"#).unwrap();
        assert!(toggles.figma_sync);
        assert!(toggles.logo_system);
        assert!(!toggles.slack_integration);
    }
}
