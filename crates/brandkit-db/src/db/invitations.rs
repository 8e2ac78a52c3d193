use async_trait::async_trait;
use brandkit_core::models::{Invitation, NewInvitation};
use brandkit_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const INVITATION_COLUMNS: &str =
    "id, email, role, client_ids, token, status, created_by, expires_at, created_at";

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn create(&self, invitation: NewInvitation) -> Result<Invitation, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Invitation>, AppError>;

    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError>;

    /// Pending invitations that have not expired yet
    async fn list_pending(&self) -> Result<Vec<Invitation>, AppError>;

    async fn list_pending_for_client(&self, client_id: Uuid)
        -> Result<Vec<Invitation>, AppError>;

    /// Flips a pending, unexpired invitation to accepted; `None` otherwise
    async fn mark_accepted(&self, id: Uuid) -> Result<Option<Invitation>, AppError>;

    async fn revoke(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PostgresInvitationRepository {
    pool: PgPool,
}

impl PostgresInvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvitationRepository for PostgresInvitationRepository {
    #[tracing::instrument(skip(self, invitation), fields(db.table = "invitations", db.operation = "insert"))]
    async fn create(&self, invitation: NewInvitation) -> Result<Invitation, AppError> {
        let created = sqlx::query_as::<Postgres, Invitation>(&format!(
            r#"
            INSERT INTO invitations (email, role, client_ids, token, created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(&invitation.email)
        .bind(invitation.role)
        .bind(&invitation.client_ids)
        .bind(&invitation.token)
        .bind(invitation.created_by)
        .bind(invitation.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invitations", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Invitation>, AppError> {
        let invitation = sqlx::query_as::<Postgres, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "invitations", db.operation = "select"))]
    async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        let invitation = sqlx::query_as::<Postgres, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invitations", db.operation = "select"))]
    async fn list_pending(&self) -> Result<Vec<Invitation>, AppError> {
        let invitations = sqlx::query_as::<Postgres, Invitation>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE status = 'pending' AND expires_at > NOW()
            ORDER BY created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(invitations)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invitations", db.operation = "select", client_id = %client_id))]
    async fn list_pending_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<Invitation>, AppError> {
        let invitations = sqlx::query_as::<Postgres, Invitation>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE status = 'pending' AND expires_at > NOW() AND $1 = ANY(client_ids)
            ORDER BY created_at DESC
            "#
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invitations)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invitations", db.operation = "update", db.record_id = %id))]
    async fn mark_accepted(&self, id: Uuid) -> Result<Option<Invitation>, AppError> {
        let invitation = sqlx::query_as::<Postgres, Invitation>(&format!(
            r#"
            UPDATE invitations SET status = 'accepted'
            WHERE id = $1 AND status = 'pending' AND expires_at > NOW()
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    #[tracing::instrument(skip(self), fields(db.table = "invitations", db.operation = "update", db.record_id = %id))]
    async fn revoke(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'revoked' WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
