use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brandkit_core::models::{NewUser, User, UserRole};
use brandkit_core::validation::normalize_email;
use brandkit_core::AppError;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::already_exists;
use crate::db::UserRepository;

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        let email = normalize_email(&user.email)?;
        let uid_taken = |u: &User| {
            user.firebase_uid.is_some() && u.firebase_uid.as_deref() == user.firebase_uid.as_deref()
        };
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&email) || uid_taken(u))
        {
            return Err(already_exists());
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email,
            name: user.name,
            role: user.role,
            firebase_uid: user.firebase_uid,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.trim();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_by_firebase_uid(&self, firebase_uid: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.firebase_uid.as_deref() == Some(firebase_uid))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|u| {
            u.role = role;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn update_profile(&self, id: Uuid, name: &str) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|u| {
            u.name = Some(name.trim().to_string());
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn link_firebase_uid(
        &self,
        id: Uuid,
        firebase_uid: &str,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != id && u.firebase_uid.as_deref() == Some(firebase_uid))
        {
            return Err(already_exists());
        }
        Ok(users.get_mut(&id).filter(|u| u.firebase_uid.is_none()).map(|u| {
            u.firebase_uid = Some(firebase_uid.to_string());
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn touch_login(&self, id: Uuid) -> Result<(), AppError> {
        if let Some(u) = self.users.write().await.get_mut(&id) {
            u.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: None,
            role: UserRole::Standard,
            firebase_uid: None,
        }
    }

    #[tokio::test]
    async fn emails_are_unique_case_insensitively() {
        let repo = InMemoryUserRepository::default();
        repo.create(new_user("Ada@Example.com")).await.unwrap();

        let err = repo.create(new_user("ada@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let found = repo.get_by_email("ADA@example.com").await.unwrap().unwrap();
        assert_eq!(found.email, "ada@example.com");
    }

    #[tokio::test]
    async fn link_firebase_uid_never_replaces_a_linked_identity() {
        let repo = InMemoryUserRepository::default();
        let user = repo.create(new_user("ceo@acme.test")).await.unwrap();

        let linked = repo.link_firebase_uid(user.id, "uid-owner").await.unwrap();
        assert_eq!(linked.unwrap().firebase_uid.as_deref(), Some("uid-owner"));

        assert!(repo.link_firebase_uid(user.id, "uid-other").await.unwrap().is_none());
        let stored = repo.get(user.id).await.unwrap().unwrap();
        assert_eq!(stored.firebase_uid.as_deref(), Some("uid-owner"));
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let repo = InMemoryUserRepository::default();
        let err = repo.create(new_user("not-an-email")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_role_on_missing_user_returns_none() {
        let repo = InMemoryUserRepository::default();
        let updated = repo.update_role(Uuid::new_v4(), UserRole::Admin).await.unwrap();
        assert!(updated.is_none());
    }
}
