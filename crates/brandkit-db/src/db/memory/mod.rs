//! In-memory repositories backed by `tokio::sync::RwLock<HashMap>`.
//!
//! They mirror the PostgreSQL constraints the handlers rely on: unique emails,
//! idempotent memberships, cascades within one repository and pending-only
//! invitation transitions.

mod assets;
mod clients;
mod inspiration;
mod integrations;
mod invitations;
mod users;

pub use assets::InMemoryAssetRepository;
pub use clients::InMemoryClientRepository;
pub use inspiration::InMemoryInspirationRepository;
pub use integrations::InMemoryIntegrationRepository;
pub use invitations::InMemoryInvitationRepository;
pub use users::InMemoryUserRepository;

use brandkit_core::AppError;

fn already_exists() -> AppError {
    AppError::Conflict("Resource already exists".to_string())
}
