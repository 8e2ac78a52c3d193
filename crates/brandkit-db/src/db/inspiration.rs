use async_trait::async_trait;
use brandkit_core::models::{
    InspirationImage, InspirationSection, NewInspirationImage, UpdateSectionRequest,
};
use brandkit_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const SECTION_COLUMNS: &str = "id, client_id, label, display_order, created_at, updated_at";

const IMAGE_COLUMNS: &str = "id, section_id, client_id, storage_key, file_name, mime_type, \
     file_size, display_order, created_at";

#[async_trait]
pub trait InspirationRepository: Send + Sync {
    /// Appends to the end of the client's sections when no order is given
    async fn create_section(
        &self,
        client_id: Uuid,
        label: &str,
        display_order: Option<i32>,
    ) -> Result<InspirationSection, AppError>;

    async fn get_section(&self, id: Uuid) -> Result<Option<InspirationSection>, AppError>;

    async fn list_sections(&self, client_id: Uuid) -> Result<Vec<InspirationSection>, AppError>;

    async fn update_section(
        &self,
        id: Uuid,
        request: &UpdateSectionRequest,
    ) -> Result<Option<InspirationSection>, AppError>;

    async fn delete_section(&self, id: Uuid) -> Result<bool, AppError>;

    async fn create_image(&self, image: NewInspirationImage)
        -> Result<InspirationImage, AppError>;

    async fn get_image(&self, id: Uuid) -> Result<Option<InspirationImage>, AppError>;

    async fn list_images(&self, section_id: Uuid) -> Result<Vec<InspirationImage>, AppError>;

    async fn list_images_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<InspirationImage>, AppError>;

    async fn delete_image(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PostgresInspirationRepository {
    pool: PgPool,
}

impl PostgresInspirationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InspirationRepository for PostgresInspirationRepository {
    #[tracing::instrument(skip(self, label), fields(db.table = "inspiration_sections", db.operation = "insert", client_id = %client_id))]
    async fn create_section(
        &self,
        client_id: Uuid,
        label: &str,
        display_order: Option<i32>,
    ) -> Result<InspirationSection, AppError> {
        let section = sqlx::query_as::<Postgres, InspirationSection>(&format!(
            r#"
            INSERT INTO inspiration_sections (client_id, label, display_order)
            VALUES ($1, $2, COALESCE($3, (
                SELECT COALESCE(MAX(display_order), -1) + 1
                FROM inspiration_sections WHERE client_id = $1
            )))
            RETURNING {SECTION_COLUMNS}
            "#
        ))
        .bind(client_id)
        .bind(label.trim())
        .bind(display_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(section)
    }

    #[tracing::instrument(skip(self), fields(db.table = "inspiration_sections", db.operation = "select", db.record_id = %id))]
    async fn get_section(&self, id: Uuid) -> Result<Option<InspirationSection>, AppError> {
        let section = sqlx::query_as::<Postgres, InspirationSection>(&format!(
            "SELECT {SECTION_COLUMNS} FROM inspiration_sections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(section)
    }

    #[tracing::instrument(skip(self), fields(db.table = "inspiration_sections", db.operation = "select", client_id = %client_id))]
    async fn list_sections(&self, client_id: Uuid) -> Result<Vec<InspirationSection>, AppError> {
        let sections = sqlx::query_as::<Postgres, InspirationSection>(&format!(
            r#"
            SELECT {SECTION_COLUMNS}
            FROM inspiration_sections
            WHERE client_id = $1
            ORDER BY display_order ASC, created_at ASC
            "#
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sections)
    }

    #[tracing::instrument(skip(self, request), fields(db.table = "inspiration_sections", db.operation = "update", db.record_id = %id))]
    async fn update_section(
        &self,
        id: Uuid,
        request: &UpdateSectionRequest,
    ) -> Result<Option<InspirationSection>, AppError> {
        let section = sqlx::query_as::<Postgres, InspirationSection>(&format!(
            r#"
            UPDATE inspiration_sections SET
                label = COALESCE($2, label),
                display_order = COALESCE($3, display_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SECTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.label.as_deref().map(str::trim))
        .bind(request.display_order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(section)
    }

    #[tracing::instrument(skip(self), fields(db.table = "inspiration_sections", db.operation = "delete", db.record_id = %id))]
    async fn delete_section(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM inspiration_sections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(
        skip(self, image),
        fields(db.table = "inspiration_images", db.operation = "insert", db.record_id = %image.id, section_id = %image.section_id)
    )]
    async fn create_image(
        &self,
        image: NewInspirationImage,
    ) -> Result<InspirationImage, AppError> {
        let created = sqlx::query_as::<Postgres, InspirationImage>(&format!(
            r#"
            INSERT INTO inspiration_images (id, section_id, client_id, storage_key, file_name,
                                            mime_type, file_size, display_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, (
                SELECT COALESCE(MAX(display_order), -1) + 1
                FROM inspiration_images WHERE section_id = $2
            ))
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(image.id)
        .bind(image.section_id)
        .bind(image.client_id)
        .bind(&image.storage_key)
        .bind(&image.file_name)
        .bind(&image.mime_type)
        .bind(image.file_size)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "inspiration_images", db.operation = "select", db.record_id = %id))]
    async fn get_image(&self, id: Uuid) -> Result<Option<InspirationImage>, AppError> {
        let image = sqlx::query_as::<Postgres, InspirationImage>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM inspiration_images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    #[tracing::instrument(skip(self), fields(db.table = "inspiration_images", db.operation = "select", section_id = %section_id))]
    async fn list_images(&self, section_id: Uuid) -> Result<Vec<InspirationImage>, AppError> {
        let images = sqlx::query_as::<Postgres, InspirationImage>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM inspiration_images
            WHERE section_id = $1
            ORDER BY display_order ASC, created_at ASC
            "#
        ))
        .bind(section_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    #[tracing::instrument(skip(self), fields(db.table = "inspiration_images", db.operation = "select", client_id = %client_id))]
    async fn list_images_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<InspirationImage>, AppError> {
        let images = sqlx::query_as::<Postgres, InspirationImage>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM inspiration_images
            WHERE client_id = $1
            ORDER BY section_id, display_order ASC, created_at ASC
            "#
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    #[tracing::instrument(skip(self), fields(db.table = "inspiration_images", db.operation = "delete", db.record_id = %id))]
    async fn delete_image(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM inspiration_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
