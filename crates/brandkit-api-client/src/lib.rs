//! Typed HTTP client for the Brandkit API.
//!
//! Surfaces the server's JSON error `message` on failures and keeps asset URLs
//! scoped to a client: once a client is selected with [`ApiClient::with_client`],
//! every asset request carries its `clientId`.

pub mod api;

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub use api::{asset_file_url, FileUrlOptions};
pub use brandkit_core::models::{
    AssetResponse, Client as BrandClient, CurrentUserResponse, PublicLinkResponse,
};

const SESSION_COOKIE: &str = "session";

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    /// Non-2xx response. `message` is the server's error message when it sent one.
    #[error("{message} (HTTP {})", status.as_u16())]
    Status { status: StatusCode, message: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ApiClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiClientError::Status { status, .. } => Some(*status),
            ApiClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiClientError>;

/// How requests authenticate.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// Session cookie, as a browser would send it
    Cookie(String),
}

/// HTTP client for the Brandkit API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Option<Auth>,
    client_id: Option<Uuid>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Option<Auth>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ApiClientError::Config("base URL is empty".to_string()));
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            client_id: None,
        })
    }

    /// Create client from environment: BRANDKIT_API_URL (or API_URL), BRANDKIT_TOKEN.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("BRANDKIT_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let auth = std::env::var("BRANDKIT_TOKEN").ok().map(Auth::Bearer);
        Self::new(base_url, auth)
    }

    /// Select the active client. Asset URLs missing a `clientId` get this one.
    pub fn with_client(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn active_client(&self) -> Option<Uuid> {
        self.client_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        let path = match self.client_id {
            Some(client_id) => ensure_client_id(path, client_id),
            None => path.to_string(),
        };
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(Auth::Bearer(token)) => request.bearer_auth(token),
            Some(Auth::Cookie(token)) => {
                request.header(reqwest::header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
            }
            None => request,
        }
    }

    /// Send a request and fail on non-2xx responses.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let mut request = self.client.request(method, self.build_url(path));
        request = self.apply_auth(request);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(ApiClientError::Status {
            status,
            message: error_message(status, &text),
        })
    }

    /// Send a request and decode its JSON body.
    pub async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let response = self.send(method, path, body).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }
}

/// Pick the most useful message out of an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.trim().is_empty());
    if let Some(message) = from_json {
        return message;
    }

    let text = body.trim();
    if !text.is_empty() {
        return text.to_string();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}

/// Whether `path` is one of the asset routes that require a `clientId`.
fn is_scoped_asset_path(path: &str) -> bool {
    let Some(rest) = path.split("/api/assets/").nth(1) else {
        return false;
    };
    let mut segments = rest.split('/');
    let id = segments.next().unwrap_or_default();
    if id.is_empty() {
        return false;
    }
    match (segments.next(), segments.next()) {
        (None, _) => true,
        (Some("file" | "convert" | "converted"), None) => true,
        _ => false,
    }
}

/// Append `clientId` to asset URLs that lack one. Other URLs pass through unchanged.
pub fn ensure_client_id(url: &str, client_id: Uuid) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (without_fragment, None),
    };

    if !is_scoped_asset_path(path) {
        return url.to_string();
    }
    let has_client_id = query
        .map(|q| q.split('&').any(|pair| pair.split('=').next() == Some("clientId")))
        .unwrap_or(false);
    if has_client_id {
        return url.to_string();
    }

    let mut scoped = match query {
        Some(q) if !q.is_empty() => format!("{}?{}&clientId={}", path, q, client_id),
        _ => format!("{}?clientId={}", path, client_id),
    };
    if let Some(fragment) = fragment {
        scoped.push('#');
        scoped.push_str(fragment);
    }
    scoped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_id() -> Uuid {
        Uuid::parse_str("7f1c0c5e-3c1a-4c7e-9a55-0d1b2f3e4a5b").unwrap()
    }

    #[test]
    fn appends_client_id_to_asset_file_urls() {
        let id = client_id();
        assert_eq!(
            ensure_client_id("/api/assets/abc/file", id),
            format!("/api/assets/abc/file?clientId={}", id)
        );
        assert_eq!(
            ensure_client_id("/api/assets/abc/file?format=png", id),
            format!("/api/assets/abc/file?format=png&clientId={}", id)
        );
        assert_eq!(
            ensure_client_id("https://brand.test/api/assets/abc", id),
            format!("https://brand.test/api/assets/abc?clientId={}", id)
        );
    }

    #[test]
    fn leaves_scoped_and_unrelated_urls_alone() {
        let id = client_id();
        let other = Uuid::new_v4();
        let scoped = format!("/api/assets/abc/file?clientId={}", other);
        assert_eq!(ensure_client_id(&scoped, id), scoped);
        assert_eq!(ensure_client_id("/api/clients", id), "/api/clients");
        assert_eq!(
            ensure_client_id("/api/assets/abc/public-links", id),
            "/api/assets/abc/public-links"
        );
    }

    #[test]
    fn error_message_prefers_json_message() {
        let status = StatusCode::FORBIDDEN;
        assert_eq!(
            error_message(status, r#"{"message":"Guests have read-only access","code":"FORBIDDEN"}"#),
            "Guests have read-only access"
        );
        assert_eq!(error_message(status, "plain failure"), "plain failure");
        assert_eq!(error_message(status, ""), "Forbidden");
    }
}
