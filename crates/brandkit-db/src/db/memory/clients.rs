use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use brandkit_core::models::{Client, CreateClientRequest, UpdateClientRequest};
use brandkit_core::AppError;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::ClientRepository;

#[derive(Default)]
struct State {
    clients: HashMap<Uuid, Client>,
    // (user_id, client_id)
    members: HashSet<(Uuid, Uuid)>,
}

#[derive(Clone, Default)]
pub struct InMemoryClientRepository {
    state: Arc<RwLock<State>>,
}

fn sorted(mut clients: Vec<Client>) -> Vec<Client> {
    clients.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
    clients
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn create(
        &self,
        request: &CreateClientRequest,
        created_by: Option<Uuid>,
    ) -> Result<Client, AppError> {
        let mut state = self.state.write().await;
        let display_order = state
            .clients
            .values()
            .map(|c| c.display_order + 1)
            .max()
            .unwrap_or(0);
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description.clone(),
            website: request.website.clone(),
            primary_color: request.primary_color.clone(),
            feature_toggles: request.feature_toggles.clone().unwrap_or_default(),
            display_order,
            created_by,
            created_at: now,
            updated_at: now,
        };
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.state.read().await.clients.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Client>, AppError> {
        Ok(sorted(
            self.state.read().await.clients.values().cloned().collect(),
        ))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Client>, AppError> {
        let state = self.state.read().await;
        Ok(sorted(
            state
                .clients
                .values()
                .filter(|c| state.members.contains(&(user_id, c.id)))
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Client>, AppError> {
        let state = self.state.read().await;
        Ok(sorted(
            ids.iter()
                .filter_map(|id| state.clients.get(id).cloned())
                .collect(),
        ))
    }

    async fn update(
        &self,
        id: Uuid,
        request: &UpdateClientRequest,
    ) -> Result<Option<Client>, AppError> {
        let mut state = self.state.write().await;
        let Some(client) = state.clients.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &request.name {
            client.name = name.trim().to_string();
        }
        if let Some(description) = &request.description {
            client.description = Some(description.clone());
        }
        if let Some(website) = &request.website {
            client.website = Some(website.clone());
        }
        if let Some(color) = &request.primary_color {
            client.primary_color = Some(color.clone());
        }
        if let Some(toggles) = &request.feature_toggles {
            client.feature_toggles = toggles.clone();
        }
        if let Some(order) = request.display_order {
            client.display_order = order;
        }
        client.updated_at = Utc::now();
        Ok(Some(client.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        state.members.retain(|(_, client_id)| *client_id != id);
        Ok(state.clients.remove(&id).is_some())
    }

    async fn add_member(&self, client_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if !state.clients.contains_key(&client_id) {
            return Err(AppError::NotFound("Client not found".to_string()));
        }
        state.members.insert((user_id, client_id));
        Ok(())
    }

    async fn remove_member(&self, client_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state.write().await.members.remove(&(user_id, client_id)))
    }

    async fn list_member_ids(&self, client_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .members
            .iter()
            .filter(|(_, c)| *c == client_id)
            .map(|(u, _)| *u)
            .collect())
    }

    async fn client_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .state
            .read()
            .await
            .members
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, c)| *c)
            .collect())
    }

    async fn is_member(&self, client_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state.read().await.members.contains(&(user_id, client_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CreateClientRequest {
        CreateClientRequest {
            name: name.to_string(),
            description: None,
            website: None,
            primary_color: None,
            feature_toggles: None,
        }
    }

    #[tokio::test]
    async fn membership_is_idempotent_and_removed_with_client() {
        let repo = InMemoryClientRepository::default();
        let client = repo.create(&request("Acme"), None).await.unwrap();
        let user = Uuid::new_v4();

        repo.add_member(client.id, user).await.unwrap();
        repo.add_member(client.id, user).await.unwrap();
        assert_eq!(repo.list_member_ids(client.id).await.unwrap(), vec![user]);
        assert_eq!(repo.list_for_user(user).await.unwrap().len(), 1);

        assert!(repo.delete(client.id).await.unwrap());
        assert!(repo.client_ids_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_clients_are_appended_in_display_order() {
        let repo = InMemoryClientRepository::default();
        let first = repo.create(&request("Zeta"), None).await.unwrap();
        let second = repo.create(&request("Alpha"), None).await.unwrap();
        assert!(second.display_order > first.display_order);

        let names: Vec<_> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }
}
