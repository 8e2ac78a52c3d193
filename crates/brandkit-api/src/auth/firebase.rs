//! Firebase ID token verification.
//!
//! Firebase signs ID tokens with RS256 keys published as a JWKS by Google.
//! Keys are cached per `kid` and refetched when a token names an unknown or
//! stale key.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brandkit_core::{AppError, Config};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Identity asserted by a verified ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub uid: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<IdentityClaims, AppError>;
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    expires_at: DateTime<Utc>,
}

pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CachedKey>>>,
    cache_ttl: chrono::Duration,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Result<Self, AppError> {
        Self::with_jwks_url(project_id, FIREBASE_JWKS_URL)
    }

    pub fn with_jwks_url(
        project_id: impl Into<String>,
        jwks_url: impl Into<String>,
    ) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create JWKS HTTP client: {}", e)))?;
        Ok(Self {
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            http_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl: chrono::Duration::hours(1),
        })
    }

    async fn fetch_jwks(&self) -> Result<Jwks, AppError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AppError::Unauthorized(format!("Failed to fetch signing keys: {}", e)))?;
        if !response.status().is_success() {
            return Err(AppError::Unauthorized(format!(
                "Signing key endpoint returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::Unauthorized(format!("Failed to parse signing keys: {}", e)))
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AppError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(kid) {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.key.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;
        let expires_at = Utc::now() + self.cache_ttl;
        let mut cache = self.cache.write().await;
        cache.clear();
        for jwk in jwks.keys.iter().filter(|k| k.kty == "RSA") {
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                continue;
            };
            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => {
                    cache.insert(jwk.kid.clone(), CachedKey { key, expires_at });
                }
                Err(e) => tracing::warn!(kid = %jwk.kid, error = %e, "Skipping unusable JWK"),
            }
        }

        cache
            .get(kid)
            .map(|cached| cached.key.clone())
            .ok_or_else(|| AppError::Unauthorized(format!("Unknown signing key {}", kid)))
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    #[tracing::instrument(skip(self, id_token))]
    async fn verify(&self, id_token: &str) -> Result<IdentityClaims, AppError> {
        let header = decode_header(id_token)
            .map_err(|e| AppError::Unauthorized(format!("Invalid ID token header: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(AppError::Unauthorized("ID token must be RS256".to_string()));
        }
        let kid = header
            .kid
            .ok_or_else(|| AppError::Unauthorized("ID token has no key id".to_string()))?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation.leeway = 60;

        let claims = decode::<FirebaseTokenClaims>(id_token, &key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "ID token validation failed");
                AppError::Unauthorized("Invalid or expired ID token".to_string())
            })?
            .claims;

        let email = claims
            .email
            .ok_or_else(|| AppError::Unauthorized("ID token carries no email".to_string()))?;
        Ok(IdentityClaims {
            uid: claims.sub,
            email: email.to_lowercase(),
            email_verified: claims.email_verified,
            name: claims.name,
        })
    }
}

/// Fixed token table. Used for local development without Firebase and in tests.
#[derive(Default, Clone)]
pub struct StaticIdentityVerifier {
    tokens: Arc<std::sync::RwLock<HashMap<String, IdentityClaims>>>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id_token: impl Into<String>, claims: IdentityClaims) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(id_token.into(), claims);
        }
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, id_token: &str) -> Result<IdentityClaims, AppError> {
        self.tokens
            .read()
            .ok()
            .and_then(|tokens| tokens.get(id_token).cloned())
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired ID token".to_string()))
    }
}

pub fn identity_verifier_from_config(config: &Config) -> Result<Arc<dyn IdentityVerifier>, AppError> {
    match config.firebase_project_id() {
        Some(project_id) => {
            tracing::info!(project_id = %project_id, "Firebase sign-in enabled");
            Ok(Arc::new(FirebaseVerifier::new(project_id)?))
        }
        None => {
            tracing::warn!("FIREBASE_PROJECT_ID not set; sign-in will reject every ID token");
            Ok(Arc::new(StaticIdentityVerifier::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_verifier_knows_only_registered_tokens() {
        let verifier = StaticIdentityVerifier::new();
        verifier.insert(
            "tok",
            IdentityClaims {
                uid: "uid-1".to_string(),
                email: "a@b.test".to_string(),
                email_verified: true,
                name: None,
            },
        );
        assert_eq!(verifier.verify("tok").await.unwrap().uid, "uid-1");
        assert!(verifier.verify("other").await.is_err());
    }

    #[tokio::test]
    async fn firebase_verifier_rejects_garbage_before_fetching_keys() {
        let verifier = FirebaseVerifier::with_jwks_url("proj", "http://127.0.0.1:9/none").unwrap();
        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
