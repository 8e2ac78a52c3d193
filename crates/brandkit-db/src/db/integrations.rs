use async_trait::async_trait;
use brandkit_core::models::{
    FigmaConnection, GoogleDriveConnection, NewSlackWorkspace, SlackWorkspace,
    UpsertFigmaConnection, UpsertGoogleDriveConnection,
};
use brandkit_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const DRIVE_COLUMNS: &str =
    "id, user_id, access_token, refresh_token, token_expires_at, created_at, updated_at";

const SLACK_COLUMNS: &str = "id, team_id, client_id, bot_token, created_by, created_at";

const FIGMA_COLUMNS: &str =
    "id, client_id, file_key, access_token, last_synced_at, created_at, updated_at";

/// Third-party connections. Tokens are stored encrypted; this layer never sees plaintext.
#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn upsert_google_drive(
        &self,
        connection: UpsertGoogleDriveConnection,
    ) -> Result<GoogleDriveConnection, AppError>;

    async fn get_google_drive(
        &self,
        user_id: Uuid,
    ) -> Result<Option<GoogleDriveConnection>, AppError>;

    async fn delete_google_drive(&self, user_id: Uuid) -> Result<bool, AppError>;

    /// Re-registering a team moves it to the new client
    async fn upsert_slack_workspace(
        &self,
        workspace: NewSlackWorkspace,
    ) -> Result<SlackWorkspace, AppError>;

    async fn get_slack_workspace(&self, team_id: &str)
        -> Result<Option<SlackWorkspace>, AppError>;

    async fn list_slack_workspaces(&self, client_id: Uuid)
        -> Result<Vec<SlackWorkspace>, AppError>;

    async fn delete_slack_workspace(&self, team_id: &str) -> Result<bool, AppError>;

    async fn upsert_figma(
        &self,
        connection: UpsertFigmaConnection,
    ) -> Result<FigmaConnection, AppError>;

    async fn get_figma(&self, client_id: Uuid) -> Result<Option<FigmaConnection>, AppError>;

    async fn mark_figma_synced(&self, client_id: Uuid) -> Result<(), AppError>;

    async fn delete_figma(&self, client_id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PostgresIntegrationRepository {
    pool: PgPool,
}

impl PostgresIntegrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IntegrationRepository for PostgresIntegrationRepository {
    #[tracing::instrument(
        skip(self, connection),
        fields(db.table = "google_drive_connections", db.operation = "upsert", user_id = %connection.user_id)
    )]
    async fn upsert_google_drive(
        &self,
        connection: UpsertGoogleDriveConnection,
    ) -> Result<GoogleDriveConnection, AppError> {
        // A refresh returns no new refresh token, so keep the stored one
        let row = sqlx::query_as::<Postgres, GoogleDriveConnection>(&format!(
            r#"
            INSERT INTO google_drive_connections (user_id, access_token, refresh_token, token_expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, google_drive_connections.refresh_token),
                token_expires_at = EXCLUDED.token_expires_at,
                updated_at = NOW()
            RETURNING {DRIVE_COLUMNS}
            "#
        ))
        .bind(connection.user_id)
        .bind(&connection.access_token)
        .bind(&connection.refresh_token)
        .bind(connection.token_expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "google_drive_connections", db.operation = "select", user_id = %user_id))]
    async fn get_google_drive(
        &self,
        user_id: Uuid,
    ) -> Result<Option<GoogleDriveConnection>, AppError> {
        let row = sqlx::query_as::<Postgres, GoogleDriveConnection>(&format!(
            "SELECT {DRIVE_COLUMNS} FROM google_drive_connections WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "google_drive_connections", db.operation = "delete", user_id = %user_id))]
    async fn delete_google_drive(&self, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM google_drive_connections WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(
        skip(self, workspace),
        fields(db.table = "slack_workspaces", db.operation = "upsert", team_id = %workspace.team_id)
    )]
    async fn upsert_slack_workspace(
        &self,
        workspace: NewSlackWorkspace,
    ) -> Result<SlackWorkspace, AppError> {
        let row = sqlx::query_as::<Postgres, SlackWorkspace>(&format!(
            r#"
            INSERT INTO slack_workspaces (team_id, client_id, bot_token, created_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (team_id) DO UPDATE SET
                client_id = EXCLUDED.client_id,
                bot_token = EXCLUDED.bot_token,
                created_by = EXCLUDED.created_by
            RETURNING {SLACK_COLUMNS}
            "#
        ))
        .bind(&workspace.team_id)
        .bind(workspace.client_id)
        .bind(&workspace.bot_token)
        .bind(workspace.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "slack_workspaces", db.operation = "select"))]
    async fn get_slack_workspace(
        &self,
        team_id: &str,
    ) -> Result<Option<SlackWorkspace>, AppError> {
        let row = sqlx::query_as::<Postgres, SlackWorkspace>(&format!(
            "SELECT {SLACK_COLUMNS} FROM slack_workspaces WHERE team_id = $1"
        ))
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "slack_workspaces", db.operation = "select", client_id = %client_id))]
    async fn list_slack_workspaces(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<SlackWorkspace>, AppError> {
        let rows = sqlx::query_as::<Postgres, SlackWorkspace>(&format!(
            "SELECT {SLACK_COLUMNS} FROM slack_workspaces WHERE client_id = $1 ORDER BY created_at ASC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "slack_workspaces", db.operation = "delete"))]
    async fn delete_slack_workspace(&self, team_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM slack_workspaces WHERE team_id = $1")
            .bind(team_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(
        skip(self, connection),
        fields(db.table = "figma_connections", db.operation = "upsert", client_id = %connection.client_id)
    )]
    async fn upsert_figma(
        &self,
        connection: UpsertFigmaConnection,
    ) -> Result<FigmaConnection, AppError> {
        let row = sqlx::query_as::<Postgres, FigmaConnection>(&format!(
            r#"
            INSERT INTO figma_connections (client_id, file_key, access_token)
            VALUES ($1, $2, $3)
            ON CONFLICT (client_id) DO UPDATE SET
                file_key = EXCLUDED.file_key,
                access_token = EXCLUDED.access_token,
                updated_at = NOW()
            RETURNING {FIGMA_COLUMNS}
            "#
        ))
        .bind(connection.client_id)
        .bind(&connection.file_key)
        .bind(&connection.access_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "figma_connections", db.operation = "select", client_id = %client_id))]
    async fn get_figma(&self, client_id: Uuid) -> Result<Option<FigmaConnection>, AppError> {
        let row = sqlx::query_as::<Postgres, FigmaConnection>(&format!(
            "SELECT {FIGMA_COLUMNS} FROM figma_connections WHERE client_id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "figma_connections", db.operation = "update", client_id = %client_id))]
    async fn mark_figma_synced(&self, client_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE figma_connections SET last_synced_at = NOW(), updated_at = NOW() WHERE client_id = $1",
        )
        .bind(client_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "figma_connections", db.operation = "delete", client_id = %client_id))]
    async fn delete_figma(&self, client_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM figma_connections WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
