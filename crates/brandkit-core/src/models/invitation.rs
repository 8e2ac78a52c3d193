use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::UserRole;
use crate::error::AppError;
use crate::validation::normalize_email;

/// Invitations stay valid for a week.
pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "invitation_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub client_ids: Vec<Uuid>,
    #[serde(skip_serializing)]
    pub token: String,
    pub status: InvitationStatus,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Pending and not yet expired
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && !self.is_expired(now)
    }
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub role: UserRole,
    pub client_ids: Vec<Uuid>,
    pub token: String,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl NewInvitation {
    pub fn new(
        email: &str,
        role: UserRole,
        client_ids: Vec<Uuid>,
        token: String,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            email: normalize_email(email)?,
            role,
            client_ids,
            token,
            created_by,
            expires_at: now + Duration::days(INVITATION_TTL_DAYS),
        })
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateInvitationRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    pub role: UserRole,
    #[validate(length(min = 1, message = "At least one client is required"))]
    pub client_ids: Vec<Uuid>,
}

/// What an invitee sees before signing up
#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationDetails {
    pub email: String,
    pub role: UserRole,
    pub client_names: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptInvitationRequest {
    /// Firebase ID token of the newly signed-up account
    pub id_token: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_invitation_normalizes_email_and_sets_expiry() {
        let now = Utc::now();
        let invite = NewInvitation::new(
            "  Jane@Example.COM ",
            UserRole::Editor,
            vec![Uuid::new_v4()],
            "tok".to_string(),
            Uuid::new_v4(),
            now,
        )
        .unwrap();
        assert_eq!(invite.email, "jane@example.com");
        assert_eq!(invite.expires_at, now + Duration::days(7));
    }

    #[test]
    fn accepted_invitation_is_not_usable() {
        let now = Utc::now();
        let mut invitation = Invitation {
            id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            role: UserRole::Guest,
            client_ids: vec![],
            token: "t".to_string(),
            status: InvitationStatus::Pending,
            created_by: Uuid::new_v4(),
            expires_at: now + Duration::days(1),
            created_at: now,
        };
        assert!(invitation.is_usable(now));
        invitation.status = InvitationStatus::Accepted;
        assert!(!invitation.is_usable(now));
        invitation.status = InvitationStatus::Pending;
        assert!(!invitation.is_usable(now + Duration::days(2)));
    }
}
