//! Invitations: admins invite by email, the invitee signs up through the emailed link.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use brandkit_core::models::{
    AcceptInvitationRequest, CreateInvitationRequest, Invitation, InvitationDetails, NewInvitation,
    NewUser, User, UserRole,
};
use brandkit_core::validation::normalize_email;
use brandkit_core::AppError;
use brandkit_services::InvitationEmail;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthUser, IdentityClaims};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::auth::{link_identity, require_verified_email, session_response};
use crate::middleware::audit;
use crate::state::AppState;
use crate::utils::access::{require_client, require_role};
use crate::utils::tokens::random_token;

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateInvitationResponse {
    pub invitation: Invitation,
    pub accept_url: String,
    /// False when the email could not be delivered; the link can be shared by hand
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
pub struct InvitationListQuery {
    #[serde(rename = "clientId", default)]
    pub client_id: Option<Uuid>,
}

async fn load_usable(state: &AppState, token: &str) -> Result<Invitation, AppError> {
    let invitation = state
        .repos
        .invitations
        .get_by_token(token)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;
    if !invitation.is_usable(Utc::now()) {
        return Err(AppError::Gone(
            "This invitation has expired or was already used".to_string(),
        ));
    }
    Ok(invitation)
}

/// Consume the invitation behind `token` for a verified identity and return the account
pub(crate) async fn accept_for_identity(
    state: &AppState,
    token: &str,
    identity: &IdentityClaims,
    name: Option<String>,
) -> Result<User, AppError> {
    require_verified_email(identity)?;
    let invitation = load_usable(state, token).await?;
    if invitation.email != normalize_email(&identity.email)? {
        return Err(AppError::Forbidden(
            "This invitation was sent to a different email address".to_string(),
        ));
    }

    // Only the request that flips the invitation goes on to grant access
    let invitation = state
        .repos
        .invitations
        .mark_accepted(invitation.id)
        .await?
        .ok_or_else(|| {
            AppError::Gone("This invitation has expired or was already used".to_string())
        })?;

    let existing = match state.repos.users.get_by_firebase_uid(&identity.uid).await? {
        Some(user) => Some(user),
        None => state.repos.users.get_by_email(&invitation.email).await?,
    };
    let user = match existing {
        Some(user) => link_identity(state, user, identity).await?,
        None => {
            state
                .repos
                .users
                .create(NewUser {
                    email: invitation.email.clone(),
                    name: name.or_else(|| identity.name.clone()),
                    role: invitation.role,
                    firebase_uid: Some(identity.uid.clone()),
                })
                .await?
        }
    };

    // Clients deleted since the invitation was sent are skipped
    let clients = state
        .repos
        .clients
        .list_by_ids(&invitation.client_ids)
        .await?;
    for client in &clients {
        state.repos.clients.add_member(client.id, user.id).await?;
        audit::log_membership_change(invitation.created_by, user.id, client.id, true);
    }
    audit::log_invitation("accepted", Some(user.id), invitation.id, &invitation.email);

    Ok(user)
}

#[utoipa::path(
    post,
    path = "/api/invitations",
    tag = "invitations",
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation created", body = CreateInvitationResponse),
        (status = 403, description = "Caller cannot invite with this role or client", body = ErrorResponse),
        (status = 409, description = "A user with this email already exists", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, request), fields(user_id = %auth.user_id()))]
pub async fn create_invitation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<CreateInvitationResponse>), HttpAppError> {
    let role = auth.role();
    if !role.can_invite() {
        return Err(AppError::Forbidden("Only admins can send invitations".to_string()).into());
    }
    if !role.can_assign_role(request.role) {
        return Err(AppError::Forbidden(format!(
            "You cannot invite users with the {} role",
            request.role
        ))
        .into());
    }

    let email = normalize_email(&request.email)?;

    let mut client_names = Vec::with_capacity(request.client_ids.len());
    for client_id in &request.client_ids {
        client_names.push(require_client(&state.repos, &auth, *client_id).await?.name);
    }

    if state
        .repos
        .users
        .get_by_email(&email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("A user with this email already exists".to_string()).into());
    }

    let token = random_token();
    let invitation = state
        .repos
        .invitations
        .create(NewInvitation::new(
            &email,
            request.role,
            request.client_ids.clone(),
            token.clone(),
            auth.user_id(),
            Utc::now(),
        )?)
        .await?;
    audit::log_invitation("created", Some(auth.user_id()), invitation.id, &invitation.email);

    let accept_url = InvitationEmail::accept_url(state.config.frontend_url(), &token);
    let email = InvitationEmail {
        to: invitation.email.clone(),
        inviter_name: auth
            .user
            .name
            .clone()
            .unwrap_or_else(|| auth.user.email.clone()),
        role: invitation.role,
        client_names,
        accept_url: accept_url.clone(),
    };
    let email_sent = match state.mailer.send_invitation(&email).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, invitation_id = %invitation.id, "Failed to send invitation email");
            false
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateInvitationResponse {
            invitation,
            accept_url,
            email_sent,
        }),
    ))
}

/// Pending invitations, optionally for one client
#[utoipa::path(
    get,
    path = "/api/invitations",
    tag = "invitations",
    params(("clientId" = Option<Uuid>, Query, description = "Only invitations granting this client")),
    responses((status = 200, description = "Pending invitations", body = Vec<Invitation>))
)]
pub async fn list_invitations(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<InvitationListQuery>,
) -> Result<Json<Vec<Invitation>>, HttpAppError> {
    require_role(&auth, UserRole::Admin)?;

    let invitations = match query.client_id {
        Some(client_id) => {
            require_client(&state.repos, &auth, client_id).await?;
            state
                .repos
                .invitations
                .list_pending_for_client(client_id)
                .await?
        }
        None => {
            let all = state.repos.invitations.list_pending().await?;
            if auth.actor.is_super_admin() {
                all
            } else {
                all.into_iter()
                    .filter(|inv| inv.client_ids.iter().any(|c| auth.actor.is_member(*c)))
                    .collect()
            }
        }
    };
    Ok(Json(invitations))
}

/// What the signup page shows before the invitee signs in
#[utoipa::path(
    get,
    path = "/api/invitations/{token}",
    tag = "invitations",
    params(("token" = String, Path, description = "Invitation token from the email link")),
    responses(
        (status = 200, description = "Invitation details", body = InvitationDetails),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 410, description = "Expired or already used", body = ErrorResponse)
    )
)]
pub async fn get_invitation(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<InvitationDetails>, HttpAppError> {
    let invitation = load_usable(&state, &token).await?;
    let client_names = state
        .repos
        .clients
        .list_by_ids(&invitation.client_ids)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    Ok(Json(InvitationDetails {
        email: invitation.email,
        role: invitation.role,
        client_names,
        expires_at: invitation.expires_at,
    }))
}

#[utoipa::path(
    post,
    path = "/api/invitations/{token}/accept",
    tag = "invitations",
    params(("token" = String, Path, description = "Invitation token from the email link")),
    request_body = AcceptInvitationRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = crate::handlers::auth::SessionResponse),
        (status = 403, description = "Signed-in email does not match", body = ErrorResponse),
        (status = 410, description = "Expired or already used", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, token, request))]
pub async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(request): Json<AcceptInvitationRequest>,
) -> Result<Response, HttpAppError> {
    let identity = state.identity.verify(&request.id_token).await?;
    let name = request
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let user = accept_for_identity(&state, &token, &identity, name).await?;

    state.repos.users.touch_login(user.id).await?;
    audit::log_authentication(Some(user.id), Some(&user.email), "invitation", true, None);
    Ok(session_response(&state, user, None, StatusCode::CREATED).await?)
}

#[utoipa::path(
    delete,
    path = "/api/invitations/{id}",
    tag = "invitations",
    params(("id" = Uuid, Path, description = "Invitation ID")),
    responses(
        (status = 204, description = "Invitation revoked"),
        (status = 404, description = "Invitation not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn revoke_invitation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    require_role(&auth, UserRole::Admin)?;

    let invitation = state
        .repos
        .invitations
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;
    if !auth.actor.is_super_admin()
        && !invitation
            .client_ids
            .iter()
            .all(|c| auth.actor.is_member(*c))
    {
        return Err(AppError::Forbidden(
            "Invitation grants access to clients you do not manage".to_string(),
        )
        .into());
    }

    if !state.repos.invitations.revoke(id).await? {
        return Err(AppError::NotFound("Invitation not found".to_string()).into());
    }
    audit::log_invitation("revoked", Some(auth.user_id()), id, &invitation.email);
    Ok(StatusCode::NO_CONTENT)
}
