//! Application state shared by every handler.

use std::sync::Arc;

use brandkit_core::{AppError, Config, EncryptionService};
use brandkit_db::Repositories;
use brandkit_services::{
    AssetConverter, FigmaClient, GoogleDriveClient, InvitationMailer, SlackService,
};
use brandkit_storage::Storage;
use sqlx::PgPool;

use crate::auth::{IdentityVerifier, SessionService};

/// Third-party integrations. Google Drive is absent unless OAuth is configured.
#[derive(Clone)]
pub struct IntegrationState {
    pub google: Option<GoogleDriveClient>,
    pub figma: FigmaClient,
    pub slack: Arc<SlackService>,
    pub slack_signing_secret: Option<String>,
    /// Cipher for tokens stored at rest; absent when ENCRYPTION_KEY is unset
    pub encryption: Option<EncryptionService>,
}

impl IntegrationState {
    pub fn encryption(&self) -> Result<&EncryptionService, AppError> {
        self.encryption.as_ref().ok_or_else(|| {
            AppError::Internal("ENCRYPTION_KEY must be set to store integration tokens".to_string())
        })
    }

    pub fn google(&self) -> Result<&GoogleDriveClient, AppError> {
        self.google
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("Google Drive is not configured".to_string()))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Present in production; in-memory setups run without a database
    pub pool: Option<PgPool>,
    pub repos: Repositories,
    pub storage: Arc<dyn Storage>,
    pub converter: Arc<AssetConverter>,
    pub sessions: SessionService,
    pub identity: Arc<dyn IdentityVerifier>,
    pub mailer: Arc<dyn InvitationMailer>,
    pub integrations: IntegrationState,
}

impl axum::extract::FromRef<Arc<AppState>> for IntegrationState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.integrations.clone()
    }
}
