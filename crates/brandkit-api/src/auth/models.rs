use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use brandkit_core::models::{User, UserRole};
use brandkit_core::{Actor, AppError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HttpAppError;

/// Session JWT claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: Uuid, // user_id
    /// Role a super admin is previewing the app as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_as: Option<UserRole>,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, inserted into request extensions by the auth middleware
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub actor: Actor,
}

impl AuthUser {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> UserRole {
        self.actor.effective_role()
    }
}

// Read straight from the parts so it also works next to `Multipart`
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Not signed in".to_string())))
    }
}
