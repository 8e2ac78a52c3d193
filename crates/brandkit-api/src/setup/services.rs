//! Builds [`AppState`] from configuration and already-constructed backends.
//! Tests call [`build_state`] directly with in-memory repositories.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use brandkit_core::{Config, EncryptionService};
use brandkit_db::Repositories;
use brandkit_services::figma::FIGMA_API_BASE;
use brandkit_services::{
    AssetConverter, FigmaClient, FontConverter, GoogleDriveClient, InvitationMailer, SlackService,
};
use brandkit_storage::Storage;
use sqlx::PgPool;

use crate::auth::{IdentityVerifier, SessionService};
use crate::state::{AppState, IntegrationState};

fn google_client(config: &Config) -> Result<Option<GoogleDriveClient>> {
    let (Some(client_id), Some(secret), Some(redirect_uri)) = (
        config.google_client_id(),
        config.google_client_secret(),
        config.google_redirect_uri(),
    ) else {
        tracing::info!("Google OAuth not configured, Drive import disabled");
        return Ok(None);
    };
    let client = GoogleDriveClient::new(client_id, secret, redirect_uri)
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(Some(client))
}

pub fn build_state(
    config: Config,
    pool: Option<PgPool>,
    repos: Repositories,
    storage: Arc<dyn Storage>,
    identity: Arc<dyn IdentityVerifier>,
    mailer: Arc<dyn InvitationMailer>,
) -> Result<Arc<AppState>> {
    let fonts = FontConverter::new(
        config.fontforge_path(),
        Duration::from_secs(config.conversion_timeout_secs()),
    );
    let converter = Arc::new(AssetConverter::new(
        storage.clone(),
        repos.assets.clone(),
        fonts,
    ));

    let sessions = SessionService::new(
        config.jwt_secret(),
        config.session_ttl_hours(),
        config.is_production(),
    );

    let encryption = config
        .encryption_key()
        .map(EncryptionService::from_base64_key)
        .transpose()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Invalid ENCRYPTION_KEY")?;
    if encryption.is_none() {
        tracing::warn!("ENCRYPTION_KEY not set, integrations that store tokens are unavailable");
    }

    let slack = Arc::new(SlackService::new(
        repos.clients.clone(),
        repos.assets.clone(),
        repos.integrations.clone(),
        storage.clone(),
        config.public_base_url(),
    ));

    let integrations = IntegrationState {
        google: google_client(&config)?,
        figma: FigmaClient::new(FIGMA_API_BASE).map_err(|e| anyhow::anyhow!("{}", e))?,
        slack,
        slack_signing_secret: config.slack_signing_secret().map(str::to_string),
        encryption,
    };

    Ok(Arc::new(AppState {
        config,
        pool,
        repos,
        storage,
        converter,
        sessions,
        identity,
        mailer,
        integrations,
    }))
}
