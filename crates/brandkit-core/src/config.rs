//! Configuration module
//!
//! Configuration is read from environment variables (optionally seeded from a
//! `.env` file) and validated once at startup.

use std::env;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SESSION_TTL_HOURS: i64 = 24 * 7;
const MAX_UPLOAD_SIZE_MB: usize = 50;
const CONVERSION_TIMEOUT_SECS: u64 = 60;

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub environment: String,
}

/// Full application configuration
#[derive(Clone, Debug)]
pub struct BrandkitConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub r2_account_id: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Uploads and conversion
    pub max_upload_size_bytes: usize,
    pub fontforge_path: String,
    pub conversion_timeout_secs: u64,
    // Identity
    pub firebase_project_id: Option<String>,
    /// Base64-encoded 32-byte key for integration tokens at rest
    pub encryption_key: Option<String>,
    // Integrations
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: Option<String>,
    pub slack_signing_secret: Option<String>,
    // Email
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
    pub frontend_url: String,
    /// Externally reachable base URL of this API, used in Slack swatches and public links
    pub public_base_url: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<BrandkitConfig>);

impl Config {
    fn inner(&self) -> &BrandkitConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = BrandkitConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn session_ttl_hours(&self) -> i64 {
        self.inner().base.session_ttl_hours
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn r2_account_id(&self) -> Option<&str> {
        self.inner().r2_account_id.as_deref()
    }

    pub fn aws_access_key_id(&self) -> Option<&str> {
        self.inner().aws_access_key_id.as_deref()
    }

    pub fn aws_secret_access_key(&self) -> Option<&str> {
        self.inner().aws_secret_access_key.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn fontforge_path(&self) -> &str {
        &self.inner().fontforge_path
    }

    pub fn conversion_timeout_secs(&self) -> u64 {
        self.inner().conversion_timeout_secs
    }

    pub fn firebase_project_id(&self) -> Option<&str> {
        self.inner().firebase_project_id.as_deref()
    }

    pub fn encryption_key(&self) -> Option<&str> {
        self.inner().encryption_key.as_deref()
    }

    pub fn google_client_id(&self) -> Option<&str> {
        self.inner().google_client_id.as_deref()
    }

    pub fn google_client_secret(&self) -> Option<&str> {
        self.inner().google_client_secret.as_deref()
    }

    pub fn google_redirect_uri(&self) -> Option<&str> {
        self.inner().google_redirect_uri.as_deref()
    }

    pub fn slack_signing_secret(&self) -> Option<&str> {
        self.inner().slack_signing_secret.as_deref()
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.inner().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> Option<u16> {
        self.inner().smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.inner().smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.inner().smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.inner().smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.inner().smtp_tls
    }

    pub fn frontend_url(&self) -> &str {
        &self.inner().frontend_url
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl BrandkitConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("NODE_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let storage_backend = match optional_var("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::Local,
        };

        let server_port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let base = BaseConfig {
            server_port,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .or_else(|_| env::var("SESSION_SECRET"))
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for session signing"))?,
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| SESSION_TTL_HOURS.to_string())
                .parse()
                .unwrap_or(SESSION_TTL_HOURS),
            environment,
        };

        let config = BrandkitConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            storage_backend,
            s3_bucket: optional_var("S3_BUCKET"),
            s3_region: optional_var("S3_REGION").or_else(|| optional_var("AWS_REGION")),
            s3_endpoint: optional_var("S3_ENDPOINT"),
            r2_account_id: optional_var("R2_ACCOUNT_ID"),
            aws_access_key_id: optional_var("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional_var("AWS_SECRET_ACCESS_KEY"),
            local_storage_path: optional_var("LOCAL_STORAGE_PATH")
                .or_else(|| Some("./uploads".to_string())),
            local_storage_base_url: optional_var("LOCAL_STORAGE_BASE_URL")
                .or_else(|| Some(format!("http://localhost:{}/uploads", server_port))),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            fontforge_path: env::var("FONTFORGE_PATH").unwrap_or_else(|_| "fontforge".to_string()),
            conversion_timeout_secs: env::var("CONVERSION_TIMEOUT_SECS")
                .unwrap_or_else(|_| CONVERSION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONVERSION_TIMEOUT_SECS),
            firebase_project_id: optional_var("FIREBASE_PROJECT_ID"),
            encryption_key: optional_var("ENCRYPTION_KEY"),
            google_client_id: optional_var("GOOGLE_CLIENT_ID"),
            google_client_secret: optional_var("GOOGLE_CLIENT_SECRET"),
            google_redirect_uri: optional_var("GOOGLE_REDIRECT_URI"),
            slack_signing_secret: optional_var("SLACK_SIGNING_SECRET"),
            smtp_host: optional_var("SMTP_HOST"),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0),
            smtp_user: optional_var("SMTP_USER"),
            smtp_password: optional_var("SMTP_PASSWORD"),
            smtp_from: optional_var("SMTP_FROM"),
            smtp_tls: env::var("SMTP_TLS")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", server_port)),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.smtp_host.is_some() != self.smtp_from.is_some() {
            return Err(anyhow::anyhow!(
                "SMTP_HOST and SMTP_FROM must be set together"
            ));
        }

        if self.google_client_id.is_some()
            && (self.google_client_secret.is_none() || self.google_redirect_uri.is_none())
        {
            return Err(anyhow::anyhow!(
                "GOOGLE_CLIENT_ID requires GOOGLE_CLIENT_SECRET and GOOGLE_REDIRECT_URI"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::R2 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using R2 storage backend"
                    ));
                }
                if self.r2_account_id.is_none() && self.s3_endpoint.is_none() {
                    return Err(anyhow::anyhow!(
                        "R2_ACCOUNT_ID or S3_ENDPOINT must be set when using R2 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BrandkitConfig {
        BrandkitConfig {
            base: BaseConfig {
                server_port: 5000,
                cors_origins: vec!["http://localhost:5173".to_string()],
                db_max_connections: 5,
                db_timeout_seconds: 5,
                jwt_secret: "a".repeat(32),
                session_ttl_hours: 24,
                environment: "test".to_string(),
            },
            database_url: "postgres://localhost/brandkit".to_string(),
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            r2_account_id: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            local_storage_path: Some("/tmp/brandkit".to_string()),
            local_storage_base_url: None,
            max_upload_size_bytes: 1024,
            fontforge_path: "fontforge".to_string(),
            conversion_timeout_secs: 10,
            firebase_project_id: None,
            encryption_key: None,
            google_client_id: None,
            google_client_secret: None,
            google_redirect_uri: None,
            slack_signing_secret: None,
            smtp_host: None,
            smtp_port: None,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: true,
            frontend_url: "http://localhost:5173".to_string(),
            public_base_url: "http://localhost:5000".to_string(),
        }
    }

    #[test]
    fn accepts_valid_local_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let mut config = sample();
        config.base.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn r2_requires_account_or_endpoint() {
        let mut config = sample();
        config.storage_backend = StorageBackend::R2;
        config.s3_bucket = Some("brand-assets".to_string());
        assert!(config.validate().is_err());

        config.r2_account_id = Some("abc123".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn smtp_host_requires_from() {
        let mut config = sample();
        config.smtp_host = Some("smtp.example.com".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn production_detection() {
        let mut inner = sample();
        inner.base.environment = "Production".to_string();
        assert!(Config(Box::new(inner)).is_production());
    }
}
