use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brandkit_core::models::{
    InspirationImage, InspirationSection, NewInspirationImage, UpdateSectionRequest,
};
use brandkit_core::AppError;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::InspirationRepository;

#[derive(Default)]
struct State {
    sections: HashMap<Uuid, InspirationSection>,
    images: HashMap<Uuid, InspirationImage>,
}

#[derive(Clone, Default)]
pub struct InMemoryInspirationRepository {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl InspirationRepository for InMemoryInspirationRepository {
    async fn create_section(
        &self,
        client_id: Uuid,
        label: &str,
        display_order: Option<i32>,
    ) -> Result<InspirationSection, AppError> {
        let mut state = self.state.write().await;
        let display_order = display_order.unwrap_or_else(|| {
            state
                .sections
                .values()
                .filter(|s| s.client_id == client_id)
                .map(|s| s.display_order + 1)
                .max()
                .unwrap_or(0)
        });
        let now = Utc::now();
        let section = InspirationSection {
            id: Uuid::new_v4(),
            client_id,
            label: label.trim().to_string(),
            display_order,
            created_at: now,
            updated_at: now,
        };
        state.sections.insert(section.id, section.clone());
        Ok(section)
    }

    async fn get_section(&self, id: Uuid) -> Result<Option<InspirationSection>, AppError> {
        Ok(self.state.read().await.sections.get(&id).cloned())
    }

    async fn list_sections(&self, client_id: Uuid) -> Result<Vec<InspirationSection>, AppError> {
        let mut sections: Vec<InspirationSection> = self
            .state
            .read()
            .await
            .sections
            .values()
            .filter(|s| s.client_id == client_id)
            .cloned()
            .collect();
        sections.sort_by_key(|s| (s.display_order, s.created_at));
        Ok(sections)
    }

    async fn update_section(
        &self,
        id: Uuid,
        request: &UpdateSectionRequest,
    ) -> Result<Option<InspirationSection>, AppError> {
        let mut state = self.state.write().await;
        let Some(section) = state.sections.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(label) = &request.label {
            section.label = label.trim().to_string();
        }
        if let Some(order) = request.display_order {
            section.display_order = order;
        }
        section.updated_at = Utc::now();
        Ok(Some(section.clone()))
    }

    async fn delete_section(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        state.images.retain(|_, image| image.section_id != id);
        Ok(state.sections.remove(&id).is_some())
    }

    async fn create_image(
        &self,
        image: NewInspirationImage,
    ) -> Result<InspirationImage, AppError> {
        let mut state = self.state.write().await;
        if !state.sections.contains_key(&image.section_id) {
            return Err(AppError::NotFound("Section not found".to_string()));
        }
        let display_order = state
            .images
            .values()
            .filter(|i| i.section_id == image.section_id)
            .map(|i| i.display_order + 1)
            .max()
            .unwrap_or(0);
        let created = InspirationImage {
            id: image.id,
            section_id: image.section_id,
            client_id: image.client_id,
            storage_key: image.storage_key,
            file_name: image.file_name,
            mime_type: image.mime_type,
            file_size: image.file_size,
            display_order,
            created_at: Utc::now(),
        };
        state.images.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_image(&self, id: Uuid) -> Result<Option<InspirationImage>, AppError> {
        Ok(self.state.read().await.images.get(&id).cloned())
    }

    async fn list_images(&self, section_id: Uuid) -> Result<Vec<InspirationImage>, AppError> {
        let mut images: Vec<InspirationImage> = self
            .state
            .read()
            .await
            .images
            .values()
            .filter(|i| i.section_id == section_id)
            .cloned()
            .collect();
        images.sort_by_key(|i| (i.display_order, i.created_at));
        Ok(images)
    }

    async fn list_images_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<InspirationImage>, AppError> {
        let mut images: Vec<InspirationImage> = self
            .state
            .read()
            .await
            .images
            .values()
            .filter(|i| i.client_id == client_id)
            .cloned()
            .collect();
        images.sort_by_key(|i| (i.section_id, i.display_order, i.created_at));
        Ok(images)
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.state.write().await.images.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(section: &InspirationSection, name: &str) -> NewInspirationImage {
        let id = Uuid::new_v4();
        NewInspirationImage {
            id,
            section_id: section.id,
            client_id: section.client_id,
            storage_key: format!("clients/{}/inspiration/{}/{id}/{name}", section.client_id, section.id),
            file_name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            file_size: 42,
        }
    }

    #[tokio::test]
    async fn sections_and_images_append_in_order() {
        let repo = InMemoryInspirationRepository::default();
        let client = Uuid::new_v4();
        let a = repo.create_section(client, "Mood", None).await.unwrap();
        let b = repo.create_section(client, " Type ", None).await.unwrap();
        assert_eq!(a.display_order, 0);
        assert_eq!(b.display_order, 1);
        assert_eq!(b.label, "Type");

        let first = repo.create_image(image(&a, "one.jpg")).await.unwrap();
        let second = repo.create_image(image(&a, "two.jpg")).await.unwrap();
        assert!(second.display_order > first.display_order);
    }

    #[tokio::test]
    async fn deleting_section_removes_its_images() {
        let repo = InMemoryInspirationRepository::default();
        let section = repo
            .create_section(Uuid::new_v4(), "Mood", None)
            .await
            .unwrap();
        let img = repo.create_image(image(&section, "one.jpg")).await.unwrap();

        assert!(repo.delete_section(section.id).await.unwrap());
        assert!(repo.get_image(img.id).await.unwrap().is_none());
    }
}
