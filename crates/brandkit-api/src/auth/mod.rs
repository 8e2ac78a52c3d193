pub mod firebase;
pub mod middleware;
pub mod models;
pub mod session;

pub use firebase::{
    identity_verifier_from_config, FirebaseVerifier, IdentityClaims, IdentityVerifier,
    StaticIdentityVerifier,
};
pub use models::{AuthUser, SessionClaims};
pub use session::SessionService;
