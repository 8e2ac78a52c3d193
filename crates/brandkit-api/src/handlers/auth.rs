//! Sign-in, sign-out, the current user and super admin role preview.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use brandkit_core::models::{CurrentUserResponse, UpdateProfileRequest, User, UserRole};
use brandkit_core::{Actor, AppError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthUser, IdentityClaims};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::invitations::accept_for_identity;
use crate::middleware::audit;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Firebase ID token
    pub id_token: String,
    /// Lets a first-time user sign in through a pending invitation
    #[serde(default)]
    pub invitation_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: CurrentUserResponse,
    /// Same value as the session cookie, for non-browser clients
    pub token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ViewRoleRequest {
    /// Role to preview; `null` restores super admin
    pub role: Option<UserRole>,
}

pub(crate) fn current_user_response(user: User, actor: &Actor) -> CurrentUserResponse {
    CurrentUserResponse {
        effective_role: actor.effective_role(),
        view_as: actor.view_as.filter(|_| user.role == UserRole::SuperAdmin),
        client_ids: actor.client_ids.clone(),
        user,
    }
}

/// Unverified addresses prove nothing about who owns the account behind them.
pub(crate) fn require_verified_email(identity: &IdentityClaims) -> Result<(), AppError> {
    if identity.email_verified {
        return Ok(());
    }
    audit::log_authentication(
        None,
        Some(&identity.email),
        "firebase",
        false,
        Some("email not verified"),
    );
    Err(AppError::Forbidden(
        "Verify your email address before signing in".to_string(),
    ))
}

/// Attach `identity` to an account created ahead of time. An account already
/// linked to another identity is never re-linked.
pub(crate) async fn link_identity(
    state: &AppState,
    user: User,
    identity: &IdentityClaims,
) -> Result<User, AppError> {
    if user.firebase_uid.as_deref() == Some(identity.uid.as_str()) {
        return Ok(user);
    }
    match state
        .repos
        .users
        .link_firebase_uid(user.id, &identity.uid)
        .await?
    {
        Some(user) => Ok(user),
        None => {
            audit::log_authentication(
                Some(user.id),
                Some(&identity.email),
                "firebase",
                false,
                Some("account linked to another identity"),
            );
            Err(AppError::Forbidden(
                "This email is already linked to a different sign-in account".to_string(),
            ))
        }
    }
}

/// Issue a session for `user` and build the sign-in response with its cookie
pub(crate) async fn session_response(
    state: &AppState,
    user: User,
    view_as: Option<UserRole>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let client_ids = state.repos.clients.client_ids_for_user(user.id).await?;
    let mut actor = Actor::new(user.id, user.role, client_ids);
    actor.view_as = view_as;

    let token = state.sessions.issue(user.id, view_as)?;
    let cookie = state.sessions.cookie(&token);
    let body = SessionResponse {
        user: current_user_response(user, &actor),
        token,
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Exchange a Firebase ID token for a session
#[utoipa::path(
    post,
    path = "/api/auth/session",
    tag = "auth",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = SessionResponse),
        (status = 401, description = "Invalid ID token", body = ErrorResponse),
        (status = 403, description = "No account and no invitation, unverified email, or account linked to another identity", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "create_session"))]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Response, HttpAppError> {
    let identity = match state.identity.verify(&request.id_token).await {
        Ok(identity) => identity,
        Err(e) => {
            audit::log_authentication(None, None, "firebase", false, Some(&e.to_string()));
            return Err(e.into());
        }
    };
    require_verified_email(&identity)?;

    let user = match state.repos.users.get_by_firebase_uid(&identity.uid).await? {
        Some(user) => user,
        None => match state.repos.users.get_by_email(&identity.email).await? {
            // First sign-in of an account created ahead of time
            Some(user) => link_identity(&state, user, &identity).await?,
            None => match request.invitation_token.as_deref() {
                Some(invitation_token) => {
                    accept_for_identity(&state, invitation_token, &identity, None).await?
                }
                None => {
                    audit::log_authentication(
                        None,
                        Some(&identity.email),
                        "firebase",
                        false,
                        Some("no account"),
                    );
                    return Err(AppError::Forbidden(
                        "No account exists for this email; ask an admin for an invitation"
                            .to_string(),
                    )
                    .into());
                }
            },
        },
    };

    state.repos.users.touch_login(user.id).await?;
    audit::log_authentication(Some(user.id), Some(&user.email), "firebase", true, None);

    Ok(session_response(&state, user, None, StatusCode::OK).await?)
}

/// Sign out by clearing the session cookie
#[utoipa::path(
    delete,
    path = "/api/auth/session",
    tag = "auth",
    responses((status = 204, description = "Session cookie cleared"))
)]
pub async fn delete_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, state.sessions.clear_cookie())],
    )
}

#[utoipa::path(
    get,
    path = "/api/user",
    tag = "auth",
    responses(
        (status = 200, description = "Signed-in user", body = CurrentUserResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn current_user(auth: AuthUser) -> Json<CurrentUserResponse> {
    let AuthUser { user, actor } = auth;
    Json(current_user_response(user, &actor))
}

#[utoipa::path(
    patch,
    path = "/api/user",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Profile updated", body = CurrentUserResponse))
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id()))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<CurrentUserResponse>, HttpAppError> {
    let user = state
        .repos
        .users
        .update_profile(auth.user_id(), request.name.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(current_user_response(user, &auth.actor)))
}

/// Preview the app as another role. Super admins only.
#[utoipa::path(
    post,
    path = "/api/auth/view-role",
    tag = "auth",
    request_body = ViewRoleRequest,
    responses(
        (status = 200, description = "Session re-issued with the viewing role", body = SessionResponse),
        (status = 403, description = "Caller is not a super admin", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id()))]
pub async fn set_view_role(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<ViewRoleRequest>,
) -> Result<Response, HttpAppError> {
    // Checked against the stored role so a super admin previewing as guest can switch back
    if auth.user.role != UserRole::SuperAdmin {
        return Err(AppError::Forbidden(
            "Only super admins can switch their viewing role".to_string(),
        )
        .into());
    }

    let view_as = request.role.filter(|role| *role != UserRole::SuperAdmin);
    audit::log_view_role(auth.user_id(), view_as);
    Ok(session_response(&state, auth.user, view_as, StatusCode::OK).await?)
}
