use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brandkit_core::models::{
    FigmaConnection, GoogleDriveConnection, NewSlackWorkspace, SlackWorkspace,
    UpsertFigmaConnection, UpsertGoogleDriveConnection,
};
use brandkit_core::AppError;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::IntegrationRepository;

#[derive(Default)]
struct State {
    // keyed by user id
    drive: HashMap<Uuid, GoogleDriveConnection>,
    // keyed by team id
    slack: HashMap<String, SlackWorkspace>,
    // keyed by client id
    figma: HashMap<Uuid, FigmaConnection>,
}

#[derive(Clone, Default)]
pub struct InMemoryIntegrationRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl IntegrationRepository for InMemoryIntegrationRepository {
    async fn upsert_google_drive(
        &self,
        connection: UpsertGoogleDriveConnection,
    ) -> Result<GoogleDriveConnection, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let row = match state.drive.get(&connection.user_id) {
            Some(existing) => GoogleDriveConnection {
                access_token: connection.access_token,
                refresh_token: connection
                    .refresh_token
                    .or_else(|| existing.refresh_token.clone()),
                token_expires_at: connection.token_expires_at,
                updated_at: now,
                ..existing.clone()
            },
            None => GoogleDriveConnection {
                id: Uuid::new_v4(),
                user_id: connection.user_id,
                access_token: connection.access_token,
                refresh_token: connection.refresh_token,
                token_expires_at: connection.token_expires_at,
                created_at: now,
                updated_at: now,
            },
        };
        state.drive.insert(row.user_id, row.clone());
        Ok(row)
    }

    async fn get_google_drive(
        &self,
        user_id: Uuid,
    ) -> Result<Option<GoogleDriveConnection>, AppError> {
        Ok(self.state.read().await.drive.get(&user_id).cloned())
    }

    async fn delete_google_drive(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state.write().await.drive.remove(&user_id).is_some())
    }

    async fn upsert_slack_workspace(
        &self,
        workspace: NewSlackWorkspace,
    ) -> Result<SlackWorkspace, AppError> {
        let mut state = self.state.write().await;
        let (id, created_at) = state
            .slack
            .get(&workspace.team_id)
            .map(|w| (w.id, w.created_at))
            .unwrap_or_else(|| (Uuid::new_v4(), Utc::now()));
        let row = SlackWorkspace {
            id,
            team_id: workspace.team_id,
            client_id: workspace.client_id,
            bot_token: workspace.bot_token,
            created_by: workspace.created_by,
            created_at,
        };
        state.slack.insert(row.team_id.clone(), row.clone());
        Ok(row)
    }

    async fn get_slack_workspace(
        &self,
        team_id: &str,
    ) -> Result<Option<SlackWorkspace>, AppError> {
        Ok(self.state.read().await.slack.get(team_id).cloned())
    }

    async fn list_slack_workspaces(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<SlackWorkspace>, AppError> {
        let mut rows: Vec<SlackWorkspace> = self
            .state
            .read()
            .await
            .slack
            .values()
            .filter(|w| w.client_id == client_id)
            .cloned()
            .collect();
        rows.sort_by_key(|w| w.created_at);
        Ok(rows)
    }

    async fn delete_slack_workspace(&self, team_id: &str) -> Result<bool, AppError> {
        Ok(self.state.write().await.slack.remove(team_id).is_some())
    }

    async fn upsert_figma(
        &self,
        connection: UpsertFigmaConnection,
    ) -> Result<FigmaConnection, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let row = match state.figma.get(&connection.client_id) {
            Some(existing) => FigmaConnection {
                file_key: connection.file_key,
                access_token: connection.access_token,
                updated_at: now,
                ..existing.clone()
            },
            None => FigmaConnection {
                id: Uuid::new_v4(),
                client_id: connection.client_id,
                file_key: connection.file_key,
                access_token: connection.access_token,
                last_synced_at: None,
                created_at: now,
                updated_at: now,
            },
        };
        state.figma.insert(row.client_id, row.clone());
        Ok(row)
    }

    async fn get_figma(&self, client_id: Uuid) -> Result<Option<FigmaConnection>, AppError> {
        Ok(self.state.read().await.figma.get(&client_id).cloned())
    }

    async fn mark_figma_synced(&self, client_id: Uuid) -> Result<(), AppError> {
        if let Some(row) = self.state.write().await.figma.get_mut(&client_id) {
            let now = Utc::now();
            row.last_synced_at = Some(now);
            row.updated_at = now;
        }
        Ok(())
    }

    async fn delete_figma(&self, client_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state.write().await.figma.remove(&client_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drive_refresh_keeps_existing_refresh_token() {
        let repo = InMemoryIntegrationRepository::default();
        let user = Uuid::new_v4();
        repo.upsert_google_drive(UpsertGoogleDriveConnection {
            user_id: user,
            access_token: "a1".to_string(),
            refresh_token: Some("r1".to_string()),
            token_expires_at: None,
        })
        .await
        .unwrap();

        let refreshed = repo
            .upsert_google_drive(UpsertGoogleDriveConnection {
                user_id: user,
                access_token: "a2".to_string(),
                refresh_token: None,
                token_expires_at: None,
            })
            .await
            .unwrap();

        assert_eq!(refreshed.access_token, "a2");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn slack_team_moves_to_new_client_on_reregister() {
        let repo = InMemoryIntegrationRepository::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let register = |client_id| NewSlackWorkspace {
            team_id: "T123".to_string(),
            client_id,
            bot_token: None,
            created_by: Uuid::new_v4(),
        };

        repo.upsert_slack_workspace(register(a)).await.unwrap();
        repo.upsert_slack_workspace(register(b)).await.unwrap();

        assert!(repo.list_slack_workspaces(a).await.unwrap().is_empty());
        assert_eq!(
            repo.get_slack_workspace("T123").await.unwrap().unwrap().client_id,
            b
        );
    }
}
