//! Stored credentials for third-party integrations. Token columns hold
//! ciphertext produced by [`crate::EncryptionService`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GoogleDriveConnection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpsertGoogleDriveConnection {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SlackWorkspace {
    pub id: Uuid,
    pub team_id: String,
    pub client_id: Uuid,
    pub bot_token: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSlackWorkspace {
    pub team_id: String,
    pub client_id: Uuid,
    pub bot_token: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlackWorkspaceResponse {
    pub team_id: String,
    pub client_id: Uuid,
    pub has_bot_token: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SlackWorkspace> for SlackWorkspaceResponse {
    fn from(workspace: SlackWorkspace) -> Self {
        Self {
            team_id: workspace.team_id,
            client_id: workspace.client_id,
            has_bot_token: workspace.bot_token.is_some(),
            created_at: workspace.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterSlackWorkspaceRequest {
    #[validate(length(min = 1, max = 64))]
    pub team_id: String,
    #[serde(default)]
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FigmaConnection {
    pub id: Uuid,
    pub client_id: Uuid,
    pub file_key: String,
    pub access_token: String,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpsertFigmaConnection {
    pub client_id: Uuid,
    pub file_key: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ConnectFigmaRequest {
    #[validate(length(min = 1, max = 128))]
    pub file_key: String,
    #[validate(length(min = 1))]
    pub access_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FigmaConnectionResponse {
    pub client_id: Uuid,
    pub file_key: String,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<FigmaConnection> for FigmaConnectionResponse {
    fn from(connection: FigmaConnection) -> Self {
        Self {
            client_id: connection.client_id,
            file_key: connection.file_key,
            last_synced_at: connection.last_synced_at,
        }
    }
}
