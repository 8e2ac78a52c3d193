//! HS256 session tokens, carried in an HttpOnly cookie or as a bearer token.

use axum::http::{header, HeaderMap};
use brandkit_core::models::UserRole;
use brandkit_core::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::models::SessionClaims;
use crate::constants::SESSION_COOKIE;

#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionService {
    pub fn new(secret: &str, ttl_hours: i64, secure_cookie: bool) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
            secure_cookie,
        }
    }

    pub fn issue(&self, user_id: Uuid, view_as: Option<UserRole>) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            view_as,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign session: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Session has expired".to_string())
                }
                _ => AppError::Unauthorized("Invalid session".to_string()),
            })
    }

    /// `Set-Cookie` value installing the session
    pub fn cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.ttl.num_seconds()
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value removing the session
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0",
            SESSION_COOKIE
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Bearer token first, then the session cookie
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        let token = bearer.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> SessionService {
        SessionService::new("test-secret-key-min-32-characters-long", 24, false)
    }

    #[test]
    fn issued_session_verifies() {
        let sessions = service();
        let user_id = Uuid::new_v4();
        let token = sessions.issue(user_id, Some(UserRole::Guest)).unwrap();
        let claims = sessions.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.view_as, Some(UserRole::Guest));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = SessionService::new("another-secret-key-min-32-characters", 24, false)
            .issue(Uuid::new_v4(), None)
            .unwrap();
        assert!(matches!(
            service().verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_session_is_rejected() {
        let token = SessionService::new("test-secret-key-min-32-characters-long", -1, false)
            .issue(Uuid::new_v4(), None)
            .unwrap();
        let err = service().verify(&token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn token_read_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn cookie_is_http_only() {
        let cookie = SessionService::new("test-secret-key-min-32-characters-long", 1, true)
            .cookie("tok");
        assert!(cookie.starts_with("session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(cookie.ends_with("; Secure"));
    }
}
