//! Inspiration boards: labelled sections of reference images per client.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use brandkit_core::models::{
    Client, CreateSectionRequest, InspirationImage, InspirationImageResponse, InspirationSection,
    NewInspirationImage, SectionWithImages, UpdateSectionRequest, UserRole,
};
use brandkit_core::AppError;
use brandkit_services::ServedFile;
use brandkit_storage::keys;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::access::{require_client, require_role};
use crate::utils::file_response::{serve_file, Disposition};
use crate::utils::upload::read_upload_form;

fn image_response(image: InspirationImage) -> InspirationImageResponse {
    let file_url = format!(
        "/api/clients/{}/inspiration/images/{}/file",
        image.client_id, image.id
    );
    InspirationImageResponse { image, file_url }
}

async fn inspiration_client(
    state: &AppState,
    auth: &AuthUser,
    client_id: Uuid,
) -> Result<Client, AppError> {
    let client = require_client(&state.repos, auth, client_id).await?;
    if !client.feature_toggles.inspiration {
        return Err(AppError::Forbidden(
            "Inspiration is disabled for this client".to_string(),
        ));
    }
    Ok(client)
}

async fn load_section(
    state: &AppState,
    client_id: Uuid,
    section_id: Uuid,
) -> Result<InspirationSection, AppError> {
    state
        .repos
        .inspiration
        .get_section(section_id)
        .await?
        .filter(|s| s.client_id == client_id)
        .ok_or_else(|| AppError::NotFound("Section not found".to_string()))
}

async fn load_image(
    state: &AppState,
    client_id: Uuid,
    image_id: Uuid,
) -> Result<InspirationImage, AppError> {
    state
        .repos
        .inspiration
        .get_image(image_id)
        .await?
        .filter(|i| i.client_id == client_id)
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/clients/{client_id}/inspiration/sections",
    tag = "inspiration",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    responses((status = 200, description = "Sections with their images", body = Vec<SectionWithImages>))
)]
pub async fn list_sections(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<SectionWithImages>>, HttpAppError> {
    inspiration_client(&state, &auth, client_id).await?;

    let sections = state.repos.inspiration.list_sections(client_id).await?;
    let mut result = Vec::with_capacity(sections.len());
    for section in sections {
        let images = state
            .repos
            .inspiration
            .list_images(section.id)
            .await?
            .into_iter()
            .map(image_response)
            .collect();
        result.push(SectionWithImages { section, images });
    }
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/clients/{client_id}/inspiration/sections",
    tag = "inspiration",
    params(("client_id" = Uuid, Path, description = "Client ID")),
    request_body = CreateSectionRequest,
    responses(
        (status = 201, description = "Section created", body = InspirationSection),
        (status = 403, description = "Caller is below editor", body = ErrorResponse)
    )
)]
pub async fn create_section(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(client_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateSectionRequest>,
) -> Result<(StatusCode, Json<InspirationSection>), HttpAppError> {
    inspiration_client(&state, &auth, client_id).await?;
    require_role(&auth, UserRole::Editor)?;

    let section = state
        .repos
        .inspiration
        .create_section(client_id, request.label.trim(), request.display_order)
        .await?;
    Ok((StatusCode::CREATED, Json(section)))
}

#[utoipa::path(
    patch,
    path = "/api/clients/{client_id}/inspiration/sections/{id}",
    tag = "inspiration",
    params(
        ("client_id" = Uuid, Path, description = "Client ID"),
        ("id" = Uuid, Path, description = "Section ID")
    ),
    request_body = UpdateSectionRequest,
    responses((status = 200, description = "Section updated", body = InspirationSection))
)]
pub async fn update_section(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((client_id, id)): Path<(Uuid, Uuid)>,
    ValidatedJson(request): ValidatedJson<UpdateSectionRequest>,
) -> Result<Json<InspirationSection>, HttpAppError> {
    inspiration_client(&state, &auth, client_id).await?;
    require_role(&auth, UserRole::Editor)?;
    load_section(&state, client_id, id).await?;

    let section = state
        .repos
        .inspiration
        .update_section(id, &request)
        .await?
        .ok_or_else(|| AppError::NotFound("Section not found".to_string()))?;
    Ok(Json(section))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{client_id}/inspiration/sections/{id}",
    tag = "inspiration",
    params(
        ("client_id" = Uuid, Path, description = "Client ID"),
        ("id" = Uuid, Path, description = "Section ID")
    ),
    responses((status = 204, description = "Section and its images deleted"))
)]
#[tracing::instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn delete_section(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((client_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    inspiration_client(&state, &auth, client_id).await?;
    require_role(&auth, UserRole::Editor)?;
    load_section(&state, client_id, id).await?;

    let images = state.repos.inspiration.list_images(id).await?;
    state.repos.inspiration.delete_section(id).await?;
    for image in images {
        if let Err(e) = state.storage.delete(&image.storage_key).await {
            tracing::warn!(error = %e, storage_key = %image.storage_key, "Failed to delete inspiration image");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/clients/{client_id}/inspiration/sections/{id}/images",
    tag = "inspiration",
    params(
        ("client_id" = Uuid, Path, description = "Client ID"),
        ("id" = Uuid, Path, description = "Section ID")
    ),
    request_body(content = String, description = "Multipart form with an image `file`", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image added", body = InspirationImageResponse),
        (status = 415, description = "Not an image", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, auth, multipart), fields(user_id = %auth.user_id()))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((client_id, section_id)): Path<(Uuid, Uuid)>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<InspirationImageResponse>), HttpAppError> {
    inspiration_client(&state, &auth, client_id).await?;
    require_role(&auth, UserRole::Editor)?;
    load_section(&state, client_id, section_id).await?;

    let mut form = read_upload_form(multipart, state.config.max_upload_size_bytes()).await?;
    let file = form.require_file()?;
    if !file.content_type.starts_with("image/") {
        return Err(AppError::UnsupportedMediaType(format!(
            "Inspiration images must be images, got {}",
            file.content_type
        ))
        .into());
    }

    let image_id = Uuid::new_v4();
    let storage_key = keys::inspiration_key(client_id, section_id, image_id, &file.file_name);
    let file_size = file.data.len() as i64;
    state
        .storage
        .upload(&storage_key, file.data, &file.content_type)
        .await?;

    let created = state
        .repos
        .inspiration
        .create_image(NewInspirationImage {
            id: image_id,
            section_id,
            client_id,
            storage_key: storage_key.clone(),
            file_name: file.file_name,
            mime_type: file.content_type,
            file_size,
        })
        .await;
    match created {
        Ok(image) => Ok((StatusCode::CREATED, Json(image_response(image)))),
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&storage_key).await {
                tracing::warn!(error = %cleanup, storage_key = %storage_key, "Failed to remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/clients/{client_id}/inspiration/images/{id}",
    tag = "inspiration",
    params(
        ("client_id" = Uuid, Path, description = "Client ID"),
        ("id" = Uuid, Path, description = "Image ID")
    ),
    responses((status = 204, description = "Image deleted"))
)]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((client_id, id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    inspiration_client(&state, &auth, client_id).await?;
    require_role(&auth, UserRole::Editor)?;
    let image = load_image(&state, client_id, id).await?;

    state.repos.inspiration.delete_image(id).await?;
    if let Err(e) = state.storage.delete(&image.storage_key).await {
        tracing::warn!(error = %e, storage_key = %image.storage_key, "Failed to delete inspiration image");
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/clients/{client_id}/inspiration/images/{id}/file",
    tag = "inspiration",
    params(
        ("client_id" = Uuid, Path, description = "Client ID"),
        ("id" = Uuid, Path, description = "Image ID")
    ),
    responses((status = 200, description = "Image contents"))
)]
pub async fn get_image_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((client_id, id)): Path<(Uuid, Uuid)>,
) -> Result<Response, HttpAppError> {
    inspiration_client(&state, &auth, client_id).await?;
    let image = load_image(&state, client_id, id).await?;

    let served = ServedFile::Stored {
        storage_key: image.storage_key,
        mime_type: image.mime_type,
        file_name: image.file_name,
    };
    Ok(serve_file(
        state.storage.as_ref(),
        served,
        Disposition::Inline,
        "private, max-age=3600",
    )
    .await?)
}
