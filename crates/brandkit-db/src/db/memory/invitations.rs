use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brandkit_core::models::{Invitation, InvitationStatus, NewInvitation};
use brandkit_core::AppError;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::already_exists;
use crate::db::InvitationRepository;

#[derive(Clone, Default)]
pub struct InMemoryInvitationRepository {
    invitations: Arc<RwLock<HashMap<Uuid, Invitation>>>,
}

impl InMemoryInvitationRepository {
    async fn pending_where(&self, filter: impl Fn(&Invitation) -> bool) -> Vec<Invitation> {
        let now = Utc::now();
        let mut invitations: Vec<Invitation> = self
            .invitations
            .read()
            .await
            .values()
            .filter(|i| i.is_usable(now) && filter(i))
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        invitations
    }
}

#[async_trait]
impl InvitationRepository for InMemoryInvitationRepository {
    async fn create(&self, invitation: NewInvitation) -> Result<Invitation, AppError> {
        let mut invitations = self.invitations.write().await;
        if invitations.values().any(|i| i.token == invitation.token) {
            return Err(already_exists());
        }
        let created = Invitation {
            id: Uuid::new_v4(),
            email: invitation.email,
            role: invitation.role,
            client_ids: invitation.client_ids,
            token: invitation.token,
            status: InvitationStatus::Pending,
            created_by: invitation.created_by,
            expires_at: invitation.expires_at,
            created_at: Utc::now(),
        };
        invitations.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Invitation>, AppError> {
        Ok(self.invitations.read().await.get(&id).cloned())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        Ok(self
            .invitations
            .read()
            .await
            .values()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn list_pending(&self) -> Result<Vec<Invitation>, AppError> {
        Ok(self.pending_where(|_| true).await)
    }

    async fn list_pending_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<Invitation>, AppError> {
        Ok(self
            .pending_where(|i| i.client_ids.contains(&client_id))
            .await)
    }

    async fn mark_accepted(&self, id: Uuid) -> Result<Option<Invitation>, AppError> {
        let mut invitations = self.invitations.write().await;
        Ok(invitations
            .get_mut(&id)
            .filter(|i| i.is_usable(Utc::now()))
            .map(|i| {
                i.status = InvitationStatus::Accepted;
                i.clone()
            }))
    }

    async fn revoke(&self, id: Uuid) -> Result<bool, AppError> {
        let mut invitations = self.invitations.write().await;
        match invitations.get_mut(&id) {
            Some(i) if i.status == InvitationStatus::Pending => {
                i.status = InvitationStatus::Revoked;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandkit_core::models::UserRole;

    #[tokio::test]
    async fn accepted_invitation_cannot_be_accepted_or_revoked_again() {
        let repo = InMemoryInvitationRepository::default();
        let client = Uuid::new_v4();
        let invitation = repo
            .create(NewInvitation::new(
                "new@example.com",
                UserRole::Editor,
                vec![client],
                "token-1".to_string(),
                Uuid::new_v4(),
                Utc::now(),
            )
            .unwrap())
            .await
            .unwrap();

        assert_eq!(repo.list_pending_for_client(client).await.unwrap().len(), 1);
        assert!(repo.mark_accepted(invitation.id).await.unwrap().is_some());
        assert!(repo.mark_accepted(invitation.id).await.unwrap().is_none());
        assert!(!repo.revoke(invitation.id).await.unwrap());
        assert!(repo.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_invitation_cannot_be_accepted() {
        let repo = InMemoryInvitationRepository::default();
        let invitation = repo
            .create(NewInvitation::new(
                "late@example.com",
                UserRole::Guest,
                vec![Uuid::new_v4()],
                "token-late".to_string(),
                Uuid::new_v4(),
                Utc::now() - chrono::Duration::days(30),
            )
            .unwrap())
            .await
            .unwrap();

        assert!(repo.mark_accepted(invitation.id).await.unwrap().is_none());
        let stored = repo.get(invitation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Pending);
    }
}
