//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use brandkit_core::Config;
use brandkit_db::Repositories;

use crate::auth::identity_verifier_from_config;
use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production());
    tracing::info!(environment = %config.environment(), "Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let identity = identity_verifier_from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to set up identity verification: {}", e))?;
    let mailer = brandkit_services::mailer_from_config(&config);

    let state = services::build_state(
        config.clone(),
        Some(pool.clone()),
        Repositories::postgres(pool),
        storage,
        identity,
        mailer,
    )?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
