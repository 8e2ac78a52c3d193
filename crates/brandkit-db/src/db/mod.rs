//! Database repositories for the data access layer
//!
//! Each domain exposes a `*Repository` trait (the seam handlers depend on) and a
//! `Postgres*Repository` implementation backed by sqlx.

pub mod assets;
pub mod clients;
pub mod inspiration;
pub mod integrations;
pub mod invitations;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod users;

use std::sync::Arc;

use sqlx::PgPool;

pub use assets::{AssetRepository, PostgresAssetRepository};
pub use clients::{ClientRepository, PostgresClientRepository};
pub use inspiration::{InspirationRepository, PostgresInspirationRepository};
pub use integrations::{IntegrationRepository, PostgresIntegrationRepository};
pub use invitations::{InvitationRepository, PostgresInvitationRepository};
pub use users::{PostgresUserRepository, UserRepository};

/// All repositories behind their traits
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub clients: Arc<dyn ClientRepository>,
    pub assets: Arc<dyn AssetRepository>,
    pub inspiration: Arc<dyn InspirationRepository>,
    pub invitations: Arc<dyn InvitationRepository>,
    pub integrations: Arc<dyn IntegrationRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            clients: Arc::new(PostgresClientRepository::new(pool.clone())),
            assets: Arc::new(PostgresAssetRepository::new(pool.clone())),
            inspiration: Arc::new(PostgresInspirationRepository::new(pool.clone())),
            invitations: Arc::new(PostgresInvitationRepository::new(pool.clone())),
            integrations: Arc::new(PostgresIntegrationRepository::new(pool)),
        }
    }

    #[cfg(any(test, feature = "memory"))]
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::InMemoryUserRepository::default()),
            clients: Arc::new(memory::InMemoryClientRepository::default()),
            assets: Arc::new(memory::InMemoryAssetRepository::default()),
            inspiration: Arc::new(memory::InMemoryInspirationRepository::default()),
            invitations: Arc::new(memory::InMemoryInvitationRepository::default()),
            integrations: Arc::new(memory::InMemoryIntegrationRepository::default()),
        }
    }
}
