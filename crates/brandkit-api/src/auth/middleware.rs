use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use brandkit_core::{Actor, AppError};

use crate::auth::models::AuthUser;
use crate::auth::session::token_from_headers;
use crate::error::HttpAppError;
use crate::middleware::audit;
use crate::state::AppState;

/// Resolves the session (bearer token or cookie) into an [`AuthUser`].
///
/// The user row is reloaded on every request so role changes and deletions
/// take effect without waiting for the session to expire.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()).await {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(e) => {
            audit::log_authentication(None, None, "session", false, Some(&e.to_string()));
            HttpAppError(e).into_response()
        }
    }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = token_from_headers(headers)
        .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;
    let claims = state.sessions.verify(&token)?;

    let user = state
        .repos
        .users
        .get(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;
    let client_ids = state.repos.clients.client_ids_for_user(user.id).await?;

    let mut actor = Actor::new(user.id, user.role, client_ids);
    actor.view_as = claims.view_as;

    Ok(AuthUser { user, actor })
}
