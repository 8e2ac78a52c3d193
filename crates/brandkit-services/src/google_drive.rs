//! Google Drive OAuth client, file access and the import pipeline that
//! turns Drive files into brand assets while reporting progress.

use std::sync::Arc;
use std::time::Duration;

use brandkit_core::models::{AssetCategory, BrandAsset, NewBrandAsset, Visibility};
use brandkit_core::{AppError, ErrorMetadata};
use brandkit_db::AssetRepository;
use brandkit_storage::{keys, Storage};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_DRIVE_API: &str = "https://www.googleapis.com";
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,thumbnailLink";
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps.";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Drive reports sizes as decimal strings; absent for Google-native docs
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }

    pub fn is_google_native(&self) -> bool {
        self.mime_type.starts_with(GOOGLE_APPS_PREFIX)
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Bytes of a downloaded file plus the name and type to store it under
#[derive(Debug)]
pub struct DownloadedFile {
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

#[derive(Clone)]
pub struct GoogleDriveClient {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    api_base: String,
}

impl GoogleDriveClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create Google HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base: GOOGLE_DRIVE_API.to_string(),
        })
    }

    /// Point token and Drive calls at another host (tests)
    pub fn with_endpoints(mut self, token_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&include_granted_scopes=true&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(DRIVE_SCOPE),
            urlencoding::encode(state)
        )
    }

    #[tracing::instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("code", code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    #[tracing::instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let body = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let response = self
            .http_client
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| drive_error(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %text, "Google token endpoint error");
            return Err(if status.as_u16() == 400 || status.as_u16() == 401 {
                AppError::InvalidOAuthToken("Google rejected the authorization".to_string())
            } else {
                drive_error(format!("token endpoint returned HTTP {}", status.as_u16()))
            });
        }

        response
            .json()
            .await
            .map_err(|e| drive_error(format!("unexpected token response: {}", e)))
    }

    async fn get(&self, access_token: &str, url: &str) -> Result<reqwest::Response, AppError> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| drive_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %text, "Google Drive API error");
        Err(match status.as_u16() {
            401 => AppError::InvalidOAuthToken("Google Drive access expired; reconnect Google Drive".to_string()),
            403 | 404 => AppError::NotFound("Drive file not found or not accessible".to_string()),
            code => drive_error(format!("HTTP {}", code)),
        })
    }

    /// Files in a folder (root when `folder_id` is `None`), folders first
    #[tracing::instrument(skip(self, access_token))]
    pub async fn list_files(
        &self,
        access_token: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<DriveFile>, AppError> {
        let parent = folder_id.unwrap_or("root").replace('\'', "\\'");
        let query = format!("'{}' in parents and trashed = false", parent);
        let url = format!(
            "{}/drive/v3/files?q={}&fields={}&orderBy={}&pageSize=200",
            self.api_base,
            urlencoding::encode(&query),
            urlencoding::encode(&format!("files({})", FILE_FIELDS)),
            urlencoding::encode("folder,name")
        );
        let list: FileList = self
            .get(access_token, &url)
            .await?
            .json()
            .await
            .map_err(|e| drive_error(format!("unexpected file list: {}", e)))?;
        Ok(list.files)
    }

    #[tracing::instrument(skip(self, access_token))]
    pub async fn get_metadata(&self, access_token: &str, file_id: &str) -> Result<DriveFile, AppError> {
        let url = format!(
            "{}/drive/v3/files/{}?fields={}",
            self.api_base,
            urlencoding::encode(file_id),
            urlencoding::encode(FILE_FIELDS)
        );
        self.get(access_token, &url)
            .await?
            .json()
            .await
            .map_err(|e| drive_error(format!("unexpected metadata: {}", e)))
    }

    /// Download file contents. Google-native documents are exported as PDF.
    #[tracing::instrument(skip(self, access_token, file), fields(file_id = %file.id))]
    pub async fn download(
        &self,
        access_token: &str,
        file: &DriveFile,
    ) -> Result<DownloadedFile, AppError> {
        let (url, file_name, mime_type) = if file.is_google_native() {
            (
                format!(
                    "{}/drive/v3/files/{}/export?mimeType={}",
                    self.api_base,
                    urlencoding::encode(&file.id),
                    urlencoding::encode("application/pdf")
                ),
                format!("{}.pdf", file.name),
                "application/pdf".to_string(),
            )
        } else {
            (
                format!(
                    "{}/drive/v3/files/{}?alt=media",
                    self.api_base,
                    urlencoding::encode(&file.id)
                ),
                file.name.clone(),
                file.mime_type.clone(),
            )
        };

        let data = self
            .get(access_token, &url)
            .await?
            .bytes()
            .await
            .map_err(|e| drive_error(format!("download interrupted: {}", e)))?;

        Ok(DownloadedFile {
            data: data.to_vec(),
            file_name,
            mime_type,
        })
    }
}

fn drive_error(message: String) -> AppError {
    AppError::Integration {
        service: "Google Drive",
        message,
    }
}

/// Progress of an import, relayed to the browser as server-sent events
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    Started { total: usize },
    Progress { index: usize, total: usize, file_name: String },
    FileImported { asset_id: Uuid, file_name: String },
    FileFailed { file_name: String, message: String },
    Completed { imported: usize, failed: usize },
}

impl ImportEvent {
    /// SSE `event:` name
    pub fn name(&self) -> &'static str {
        match self {
            ImportEvent::Started { .. } => "started",
            ImportEvent::Progress { .. } => "progress",
            ImportEvent::FileImported { .. } => "file_imported",
            ImportEvent::FileFailed { .. } => "file_failed",
            ImportEvent::Completed { .. } => "completed",
        }
    }
}

/// Everything an import run needs
#[derive(Clone)]
pub struct ImportContext {
    pub drive: GoogleDriveClient,
    pub storage: Arc<dyn Storage>,
    pub assets: Arc<dyn AssetRepository>,
    pub client_id: Uuid,
    pub uploaded_by: Uuid,
    pub access_token: String,
    pub max_file_size: u64,
}

/// Import the given Drive files one by one. A failing file is reported and
/// skipped; the run continues. Stops early if the receiver goes away.
#[tracing::instrument(skip(ctx, events), fields(client_id = %ctx.client_id, count = file_ids.len()))]
pub async fn import_files(
    ctx: ImportContext,
    file_ids: Vec<String>,
    events: mpsc::Sender<ImportEvent>,
) -> (usize, usize) {
    let total = file_ids.len();
    let (mut imported, mut failed) = (0, 0);

    if events.send(ImportEvent::Started { total }).await.is_err() {
        return (imported, failed);
    }

    for (index, file_id) in file_ids.iter().enumerate() {
        let metadata = ctx.drive.get_metadata(&ctx.access_token, file_id).await;
        let file_name = metadata
            .as_ref()
            .map(|f| f.name.clone())
            .unwrap_or_else(|_| file_id.clone());

        let progress = ImportEvent::Progress {
            index: index + 1,
            total,
            file_name: file_name.clone(),
        };
        if events.send(progress).await.is_err() {
            tracing::info!("Import receiver dropped, stopping");
            return (imported, failed);
        }

        let outcome = match metadata {
            Ok(file) => import_one(&ctx, &file).await,
            Err(e) => Err(e),
        };

        let event = match outcome {
            Ok(asset) => {
                imported += 1;
                ImportEvent::FileImported {
                    asset_id: asset.id,
                    file_name,
                }
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(file_id = %file_id, error = %e, "Drive file import failed");
                ImportEvent::FileFailed {
                    file_name,
                    message: e.client_message(),
                }
            }
        };
        if events.send(event).await.is_err() {
            return (imported, failed);
        }
    }

    let _ = events.send(ImportEvent::Completed { imported, failed }).await;
    tracing::info!(imported, failed, "Drive import finished");
    (imported, failed)
}

async fn import_one(ctx: &ImportContext, file: &DriveFile) -> Result<BrandAsset, AppError> {
    if file.is_folder() {
        return Err(AppError::InvalidInput("Folders cannot be imported".to_string()));
    }
    if file.size_bytes().is_some_and(|size| size > ctx.max_file_size) {
        return Err(AppError::PayloadTooLarge(format!(
            "{} exceeds the upload limit",
            file.name
        )));
    }

    let downloaded = ctx.drive.download(&ctx.access_token, file).await?;
    if downloaded.data.len() as u64 > ctx.max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "{} exceeds the upload limit",
            file.name
        )));
    }

    let asset_id = Uuid::new_v4();
    let category = AssetCategory::from_mime(&downloaded.mime_type, &downloaded.file_name);
    let key = keys::asset_key(ctx.client_id, asset_id, &downloaded.file_name);
    let file_size = downloaded.data.len() as i64;
    let name = downloaded
        .file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(&downloaded.file_name)
        .to_string();

    ctx.storage
        .upload(&key, downloaded.data, &downloaded.mime_type)
        .await?;

    let created = ctx
        .assets
        .create(NewBrandAsset {
            id: asset_id,
            client_id: ctx.client_id,
            name,
            category,
            visibility: Visibility::Shared,
            data: serde_json::json!({ "source": "google_drive", "drive_file_id": file.id }),
            file_name: Some(downloaded.file_name),
            mime_type: Some(downloaded.mime_type),
            file_size: Some(file_size),
            storage_key: Some(key.clone()),
            uploaded_by: Some(ctx.uploaded_by),
        })
        .await;

    match created {
        Ok(asset) => Ok(asset),
        Err(e) => {
            // keep storage consistent with the table
            if let Err(cleanup) = ctx.storage.delete(&key).await {
                tracing::warn!(error = %cleanup, storage_key = %key, "Failed to remove orphaned upload");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandkit_db::memory::InMemoryAssetRepository;
    use brandkit_storage::LocalStorage;

    #[test]
    fn authorization_url_requests_offline_drive_access() {
        let client = GoogleDriveClient::new("cid", "secret", "http://localhost/cb").unwrap();
        let url = client.authorization_url("state 1");
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%2Fcb"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("state=state%201"));
        assert!(url.contains(&urlencoding::encode(DRIVE_SCOPE).into_owned()));
    }

    #[test]
    fn import_events_serialize_with_type_tag() {
        let event = ImportEvent::Progress {
            index: 1,
            total: 2,
            file_name: "logo.png".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["file_name"], "logo.png");
        assert_eq!(event.name(), "progress");
    }

    #[tokio::test]
    async fn exchange_code_parses_tokens() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::Regex("grant_type=authorization_code".to_string()))
            .with_status(200)
            .with_body(r#"{"access_token":"at","refresh_token":"rt","expires_in":3599,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let client = GoogleDriveClient::new("cid", "secret", "http://localhost/cb")
            .unwrap()
            .with_endpoints(format!("{}/token", server.url()), server.url());
        let tokens = client.exchange_code("code-1").await.unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn import_reports_progress_and_failures() {
        let mut server = mockito::Server::new_async().await;
        let _meta_ok = server
            .mock("GET", "/drive/v3/files/f1")
            .match_query(mockito::Matcher::UrlEncoded("fields".into(), FILE_FIELDS.into()))
            .with_status(200)
            .with_body(r#"{"id":"f1","name":"Logo.png","mimeType":"image/png","size":"4"}"#)
            .create_async()
            .await;
        let _media = server
            .mock("GET", "/drive/v3/files/f1")
            .match_query(mockito::Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body("\u{89}PNG")
            .create_async()
            .await;
        let _meta_missing = server
            .mock("GET", "/drive/v3/files/missing")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost/uploads".to_string())
                .await
                .unwrap(),
        );
        let assets: Arc<dyn AssetRepository> = Arc::new(InMemoryAssetRepository::default());
        let client_id = Uuid::new_v4();
        let ctx = ImportContext {
            drive: GoogleDriveClient::new("cid", "secret", "http://localhost/cb")
                .unwrap()
                .with_endpoints(format!("{}/token", server.url()), server.url()),
            storage: storage.clone(),
            assets: assets.clone(),
            client_id,
            uploaded_by: Uuid::new_v4(),
            access_token: "at".to_string(),
            max_file_size: 1024,
        };

        let (tx, mut rx) = mpsc::channel(16);
        let (imported, failed) =
            import_files(ctx, vec!["f1".to_string(), "missing".to_string()], tx).await;
        assert_eq!((imported, failed), (1, 1));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&ImportEvent::Started { total: 2 }));
        assert_eq!(
            events.last(),
            Some(&ImportEvent::Completed { imported: 1, failed: 1 })
        );
        assert!(events
            .iter()
            .any(|e| matches!(e, ImportEvent::FileFailed { file_name, .. } if file_name == "missing")));

        let stored = assets.list_for_client(client_id, None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Logo");
        assert_eq!(stored[0].category, AssetCategory::Logo);
        let key = stored[0].storage_key.as_deref().unwrap();
        assert!(storage.exists(key).await.unwrap());
    }
}
