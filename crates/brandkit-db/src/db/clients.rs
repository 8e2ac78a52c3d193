use async_trait::async_trait;
use brandkit_core::models::{Client, CreateClientRequest, FeatureToggles, UpdateClientRequest};
use brandkit_core::AppError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const CLIENT_COLUMNS: &str = "c.id, c.name, c.description, c.website, c.primary_color, \
     c.feature_toggles, c.display_order, c.created_by, c.created_at, c.updated_at";

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(
        &self,
        request: &CreateClientRequest,
        created_by: Option<Uuid>,
    ) -> Result<Client, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Client>, AppError>;

    async fn list_all(&self) -> Result<Vec<Client>, AppError>;

    /// Clients the user is a member of, in display order
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Client>, AppError>;

    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Client>, AppError>;

    async fn update(
        &self,
        id: Uuid,
        request: &UpdateClientRequest,
    ) -> Result<Option<Client>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Adding an existing member is a no-op
    async fn add_member(&self, client_id: Uuid, user_id: Uuid) -> Result<(), AppError>;

    async fn remove_member(&self, client_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    async fn list_member_ids(&self, client_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    async fn client_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    async fn is_member(&self, client_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PostgresClientRepository {
    pool: PgPool,
}

impl PostgresClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for PostgresClientRepository {
    #[tracing::instrument(skip(self, request), fields(db.table = "clients", db.operation = "insert"))]
    async fn create(
        &self,
        request: &CreateClientRequest,
        created_by: Option<Uuid>,
    ) -> Result<Client, AppError> {
        let toggles = request.feature_toggles.clone().unwrap_or_default();

        let client = sqlx::query_as::<Postgres, Client>(&format!(
            r#"
            WITH c AS (
                INSERT INTO clients (name, description, website, primary_color, feature_toggles,
                                     display_order, created_by)
                VALUES ($1, $2, $3, $4, $5,
                        (SELECT COALESCE(MAX(display_order), -1) + 1 FROM clients), $6)
                RETURNING *
            )
            SELECT {CLIENT_COLUMNS} FROM c
            "#
        ))
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(&request.website)
        .bind(&request.primary_color)
        .bind(Json(&toggles))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(client)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<Postgres, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "select"))]
    async fn list_all(&self) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<Postgres, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c ORDER BY c.display_order ASC, c.name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "select", user_id = %user_id))]
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<Postgres, Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients c
            JOIN user_clients uc ON uc.client_id = c.id
            WHERE uc.user_id = $1
            ORDER BY c.display_order ASC, c.name ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "clients", db.operation = "select", count = ids.len()))]
    async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Client>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let clients = sqlx::query_as::<Postgres, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.id = ANY($1) ORDER BY c.display_order ASC, c.name ASC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    #[tracing::instrument(skip(self, request), fields(db.table = "clients", db.operation = "update", db.record_id = %id))]
    async fn update(
        &self,
        id: Uuid,
        request: &UpdateClientRequest,
    ) -> Result<Option<Client>, AppError> {
        let toggles: Option<Json<&FeatureToggles>> = request.feature_toggles.as_ref().map(Json);

        let client = sqlx::query_as::<Postgres, Client>(&format!(
            r#"
            WITH c AS (
                UPDATE clients SET
                    name = COALESCE($2, name),
                    description = COALESCE($3, description),
                    website = COALESCE($4, website),
                    primary_color = COALESCE($5, primary_color),
                    feature_toggles = COALESCE($6, feature_toggles),
                    display_order = COALESCE($7, display_order),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {CLIENT_COLUMNS} FROM c
            "#
        ))
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(&request.description)
        .bind(&request.website)
        .bind(&request.primary_color)
        .bind(toggles)
        .bind(request.display_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    #[tracing::instrument(skip(self), fields(db.table = "clients", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_clients", db.operation = "insert"))]
    async fn add_member(&self, client_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_clients (user_id, client_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, client_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(client_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_clients", db.operation = "delete"))]
    async fn remove_member(&self, client_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_clients WHERE user_id = $1 AND client_id = $2")
            .bind(user_id)
            .bind(client_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_clients", db.operation = "select"))]
    async fn list_member_ids(&self, client_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT user_id FROM user_clients WHERE client_id = $1 ORDER BY created_at ASC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_clients", db.operation = "select"))]
    async fn client_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT client_id FROM user_clients WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_clients", db.operation = "select"))]
    async fn is_member(&self, client_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_clients WHERE user_id = $1 AND client_id = $2)",
        )
        .bind(user_id)
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
