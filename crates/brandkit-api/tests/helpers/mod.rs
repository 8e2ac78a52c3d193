//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p brandkit-api`. Repositories are in-memory and
//! storage is a local temp directory, so no database or Docker is needed.

pub mod fixtures;

use std::sync::Arc;

use axum_test::TestServer;
use brandkit_api::auth::{IdentityClaims, StaticIdentityVerifier};
use brandkit_api::setup::routes;
use brandkit_api::setup::services::build_state;
use brandkit_api::state::AppState;
use brandkit_core::models::{
    AssetCategory, BrandAsset, Client, CreateClientRequest, FeatureToggles, NewBrandAsset,
    NewUser, User, UserRole, Visibility,
};
use brandkit_core::{BaseConfig, BrandkitConfig, Config, StorageBackend};
use brandkit_db::Repositories;
use brandkit_services::LogMailer;
use brandkit_storage::{keys, LocalStorage, Storage};
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-that-is-long-enough-for-hs256";
pub const TEST_SLACK_SECRET: &str = "slack-signing-secret";
pub const TEST_BASE_URL: &str = "http://localhost:3000";

/// Test application: server, state and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub identity: StaticIdentityVerifier,
    pub _temp_dir: TempDir,
}

/// A signed-in user and the bearer token for their session
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn test_config(storage_path: &str) -> Config {
    Config(Box::new(BrandkitConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 5,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            session_ttl_hours: 24,
            environment: "test".to_string(),
        },
        database_url: String::new(),
        storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        r2_account_id: None,
        aws_access_key_id: None,
        aws_secret_access_key: None,
        local_storage_path: Some(storage_path.to_string()),
        local_storage_base_url: Some(format!("{}/media", TEST_BASE_URL)),
        max_upload_size_bytes: 10 * 1024 * 1024,
        fontforge_path: "fontforge".to_string(),
        conversion_timeout_secs: 30,
        firebase_project_id: None,
        encryption_key: None,
        google_client_id: None,
        google_client_secret: None,
        google_redirect_uri: None,
        slack_signing_secret: Some(TEST_SLACK_SECRET.to_string()),
        smtp_host: None,
        smtp_port: None,
        smtp_user: None,
        smtp_password: None,
        smtp_from: None,
        smtp_tls: false,
        frontend_url: "http://localhost:5173".to_string(),
        public_base_url: TEST_BASE_URL.to_string(),
    }))
}

/// Setup test app with in-memory repositories and local storage.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage_path = temp_dir.path().to_string_lossy().into_owned();
    let config = test_config(&storage_path);

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(&storage_path, format!("{}/media", TEST_BASE_URL))
            .await
            .expect("Failed to create local storage"),
    );
    let identity = StaticIdentityVerifier::new();

    let state = build_state(
        config.clone(),
        None,
        Repositories::in_memory(),
        storage,
        Arc::new(identity.clone()),
        Arc::new(LogMailer),
    )
    .expect("Failed to build app state");

    let app = routes::setup_routes(&config, state.clone()).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        identity,
        _temp_dir: temp_dir,
    }
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn repos(&self) -> &Repositories {
        &self.state.repos
    }

    /// Create a user directly in the repository and issue a session for them
    pub async fn create_user(&self, email: &str, role: UserRole) -> TestUser {
        self.insert_user(email, role, Some(format!("uid-{}", email)))
            .await
    }

    /// A user added ahead of time who has never signed in
    pub async fn create_unlinked_user(&self, email: &str, role: UserRole) -> TestUser {
        self.insert_user(email, role, None).await
    }

    async fn insert_user(
        &self,
        email: &str,
        role: UserRole,
        firebase_uid: Option<String>,
    ) -> TestUser {
        let user = self
            .repos()
            .users
            .create(NewUser {
                email: email.to_string(),
                name: None,
                role,
                firebase_uid,
            })
            .await
            .expect("Failed to create user");
        let token = self
            .state
            .sessions
            .issue(user.id, None)
            .expect("Failed to issue session");
        TestUser { user, token }
    }

    /// Register an ID token the identity verifier will accept
    pub fn register_identity(&self, id_token: &str, uid: &str, email: &str) {
        self.register_claims(id_token, uid, email, true);
    }

    /// Register an ID token whose email address the provider has not verified
    pub fn register_unverified_identity(&self, id_token: &str, uid: &str, email: &str) {
        self.register_claims(id_token, uid, email, false);
    }

    fn register_claims(&self, id_token: &str, uid: &str, email: &str, email_verified: bool) {
        self.identity.insert(
            id_token,
            IdentityClaims {
                uid: uid.to_string(),
                email: email.to_string(),
                email_verified,
                name: None,
            },
        );
    }

    pub async fn create_client(&self, name: &str, toggles: Option<FeatureToggles>) -> Client {
        let request = CreateClientRequest {
            name: name.to_string(),
            description: None,
            website: None,
            primary_color: None,
            feature_toggles: toggles,
        };
        self.repos()
            .clients
            .create(&request, None)
            .await
            .expect("Failed to create client")
    }

    pub async fn add_member(&self, client: &Client, user: &TestUser) {
        self.repos()
            .clients
            .add_member(client.id, user.user.id)
            .await
            .expect("Failed to add member");
    }

    /// Store a PNG logo for `owner` in `client`
    pub async fn create_logo(
        &self,
        client: &Client,
        owner: &TestUser,
        visibility: Visibility,
    ) -> BrandAsset {
        let id = Uuid::new_v4();
        let data = fixtures::create_minimal_png();
        let storage_key = keys::asset_key(client.id, id, "logo.png");
        self.state
            .storage
            .upload(&storage_key, data.clone(), "image/png")
            .await
            .expect("Failed to store logo");

        self.repos()
            .assets
            .create(NewBrandAsset {
                id,
                client_id: client.id,
                name: "Logo".to_string(),
                category: AssetCategory::Logo,
                visibility,
                data: serde_json::json!({}),
                file_name: Some("logo.png".to_string()),
                mime_type: Some("image/png".to_string()),
                file_size: Some(data.len() as i64),
                storage_key: Some(storage_key),
                uploaded_by: Some(owner.user.id),
            })
            .await
            .expect("Failed to create asset")
    }
}
