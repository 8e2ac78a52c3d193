//! Domain methods for the Brandkit API client.
//!
//! Response types come from `brandkit_core::models`.

use brandkit_core::models::{
    AssetCategory, AssetResponse, Client, CreatePublicLinkRequest, CurrentUserResponse,
    PublicLinkResponse,
};
use reqwest::Method;
use uuid::Uuid;

use crate::{ApiClient, Result};

/// Rendition options for an asset file URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUrlOptions {
    /// Target format, e.g. `png`, `svg` or `woff2`
    pub format: Option<String>,
    /// `dark` or `light`
    pub variant: Option<String>,
    /// Width in pixels for raster renditions
    pub size: Option<u32>,
    /// Ask for `Content-Disposition: attachment`
    pub download: bool,
}

/// Path of an asset's file endpoint. Always carries `clientId`.
pub fn asset_file_url(asset_id: Uuid, client_id: Uuid, options: &FileUrlOptions) -> String {
    let mut url = format!("/api/assets/{}/file?clientId={}", asset_id, client_id);
    if let Some(format) = options.format.as_deref() {
        url.push_str(&format!("&format={}", urlencoding::encode(format)));
    }
    if let Some(variant) = options.variant.as_deref() {
        url.push_str(&format!("&variant={}", urlencoding::encode(variant)));
    }
    if let Some(size) = options.size {
        url.push_str(&format!("&size={}", size));
    }
    if options.download {
        url.push_str("&download=true");
    }
    url
}

impl ApiClient {
    pub async fn current_user(&self) -> Result<CurrentUserResponse> {
        self.get("/api/user").await
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>> {
        self.get("/api/clients").await
    }

    pub async fn list_assets(
        &self,
        client_id: Uuid,
        category: Option<AssetCategory>,
    ) -> Result<Vec<AssetResponse>> {
        let mut path = format!("/api/clients/{}/assets", client_id);
        if let Some(category) = category {
            path.push_str(&format!("?category={}", category.as_str()));
        }
        self.get(&path).await
    }

    /// Download an asset file (or one of its renditions) as bytes.
    pub async fn download_asset(
        &self,
        asset_id: Uuid,
        client_id: Uuid,
        options: &FileUrlOptions,
    ) -> Result<Vec<u8>> {
        let path = asset_file_url(asset_id, client_id, options);
        let response = self.send::<()>(Method::GET, &path, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn create_public_link(
        &self,
        asset_id: Uuid,
        client_id: Uuid,
        expires_in_hours: Option<i64>,
    ) -> Result<PublicLinkResponse> {
        let path = format!("/api/assets/{}/public-links?clientId={}", asset_id, client_id);
        self.post_json(&path, &CreatePublicLinkRequest { expires_in_hours })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiClientError, Auth};
    use mockito::Matcher;
    use reqwest::StatusCode;

    const USER: &str = r#"{
        "id": "0b6f1c7a-2f44-4d7e-9c1b-6a1f0d2e3c4b",
        "email": "ada@acme.test",
        "name": "Ada",
        "role": "super_admin",
        "last_login_at": null,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
        "effective_role": "guest",
        "view_as": "guest",
        "client_ids": []
    }"#;

    #[test]
    fn file_url_always_has_client_id() {
        let asset = Uuid::new_v4();
        let client = Uuid::new_v4();
        let url = asset_file_url(asset, client, &FileUrlOptions::default());
        assert_eq!(url, format!("/api/assets/{}/file?clientId={}", asset, client));

        let options = FileUrlOptions {
            format: Some("png".to_string()),
            variant: Some("dark".to_string()),
            size: Some(512),
            download: true,
        };
        let url = asset_file_url(asset, client, &options);
        assert!(url.contains(&format!("clientId={}", client)));
        assert!(url.ends_with("&format=png&variant=dark&size=512&download=true"));
    }

    #[tokio::test]
    async fn current_user_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let _user = server
            .mock("GET", "/api/user")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(USER)
            .create_async()
            .await;

        let api = ApiClient::new(server.url(), Some(Auth::Bearer("tok".to_string()))).unwrap();
        let user = api.current_user().await.unwrap();
        assert_eq!(user.user.email, "ada@acme.test");
        assert_eq!(user.effective_role.as_str(), "guest");
    }

    #[tokio::test]
    async fn error_carries_server_message() {
        let mut server = mockito::Server::new_async().await;
        let _denied = server
            .mock("GET", "/api/clients")
            .with_status(403)
            .with_body(r#"{"message":"User does not have access to this client","code":"FORBIDDEN","recoverable":false}"#)
            .create_async()
            .await;

        let api = ApiClient::new(server.url(), None).unwrap();
        let err = api.list_clients().await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        match err {
            ApiClientError::Status { message, .. } => {
                assert_eq!(message, "User does not have access to this client")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn active_client_scopes_asset_requests() {
        let client_id = Uuid::new_v4();
        let asset_id = Uuid::new_v4();
        let mut server = mockito::Server::new_async().await;
        let file = server
            .mock("GET", format!("/api/assets/{}", asset_id).as_str())
            .match_query(Matcher::UrlEncoded("clientId".into(), client_id.to_string()))
            .with_status(404)
            .with_body("")
            .create_async()
            .await;

        let api = ApiClient::new(server.url(), None).unwrap().with_client(client_id);
        let err = api
            .get::<serde_json::Value>(&format!("/api/assets/{}", asset_id))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not Found (HTTP 404)");
        file.assert_async().await;
    }

    #[tokio::test]
    async fn download_returns_file_bytes() {
        let client_id = Uuid::new_v4();
        let asset_id = Uuid::new_v4();
        let mut server = mockito::Server::new_async().await;
        let _file = server
            .mock("GET", format!("/api/assets/{}/file", asset_id).as_str())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("clientId".into(), client_id.to_string()),
                Matcher::UrlEncoded("format".into(), "svg".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "image/svg+xml")
            .with_body("<svg/>")
            .create_async()
            .await;

        let api = ApiClient::new(server.url(), None).unwrap();
        let options = FileUrlOptions {
            format: Some("svg".to_string()),
            ..FileUrlOptions::default()
        };
        let bytes = api.download_asset(asset_id, client_id, &options).await.unwrap();
        assert_eq!(bytes, b"<svg/>");
    }
}
