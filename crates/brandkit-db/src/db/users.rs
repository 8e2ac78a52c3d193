use async_trait::async_trait;
use brandkit_core::models::{NewUser, User, UserRole};
use brandkit_core::validation::normalize_email;
use brandkit_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, name, role, firebase_uid, last_login_at, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Case-insensitive lookup
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn get_by_firebase_uid(&self, firebase_uid: &str) -> Result<Option<User>, AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;

    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<Option<User>, AppError>;

    async fn update_profile(&self, id: Uuid, name: &str) -> Result<Option<User>, AppError>;

    /// Attach a sign-in identity to an account that has none yet.
    /// `None` when the user is missing or already linked.
    async fn link_firebase_uid(&self, id: Uuid, firebase_uid: &str)
        -> Result<Option<User>, AppError>;

    async fn touch_login(&self, id: Uuid) -> Result<(), AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip(self, user), fields(db.table = "users", db.operation = "insert"))]
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let created = sqlx::query_as::<Postgres, User>(&format!(
            r#"
            INSERT INTO users (email, name, role, firebase_uid)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(normalize_email(&user.email)?)
        .bind(&user.name)
        .bind(user.role)
        .bind(&user.firebase_uid)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, firebase_uid), fields(db.table = "users", db.operation = "select"))]
    async fn get_by_firebase_uid(&self, firebase_uid: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE firebase_uid = $1"
        ))
        .bind(firebase_uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY email ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    async fn update_profile(&self, id: Uuid, name: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, firebase_uid), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    async fn link_firebase_uid(
        &self,
        id: Uuid,
        firebase_uid: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "UPDATE users SET firebase_uid = $2, updated_at = NOW() WHERE id = $1 AND firebase_uid IS NULL RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(firebase_uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    async fn touch_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
