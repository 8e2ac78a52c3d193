//! Random tokens and the signed Google OAuth `state` parameter.
//!
//! State = `{user_id}.{expiry_ts}.{hex(HMAC-SHA256(secret, "{user_id}.{expiry_ts}"))}`.

use brandkit_core::AppError;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use uuid::Uuid;

/// 32 random bytes as 64 hex characters
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn state_mac(payload: &str, secret: &[u8]) -> Result<Hmac<Sha256>, AppError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

pub fn sign_oauth_state(user_id: Uuid, ttl_secs: i64, secret: &[u8]) -> Result<String, AppError> {
    let payload = format!("{}.{}", user_id, Utc::now().timestamp() + ttl_secs);
    let tag = state_mac(&payload, secret)?.finalize().into_bytes();
    Ok(format!("{}.{}", payload, hex::encode(tag)))
}

/// Returns the user the state was issued for
pub fn verify_oauth_state(state: &str, secret: &[u8]) -> Result<Uuid, AppError> {
    let invalid = || AppError::BadRequest("Invalid OAuth state".to_string());

    let (payload, tag_hex) = state.rsplit_once('.').ok_or_else(invalid)?;
    let tag = hex::decode(tag_hex).map_err(|_| invalid())?;
    state_mac(payload, secret)?
        .verify_slice(&tag)
        .map_err(|_| invalid())?;

    let (user_id, expiry) = payload.split_once('.').ok_or_else(invalid)?;
    let expiry: i64 = expiry.parse().map_err(|_| invalid())?;
    if Utc::now().timestamp() > expiry {
        return Err(AppError::BadRequest(
            "OAuth state has expired, start again".to_string(),
        ));
    }
    Uuid::parse_str(user_id).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-min-32-characters-long";

    #[test]
    fn random_tokens_are_64_hex_chars() {
        let token = random_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, random_token());
    }

    #[test]
    fn state_round_trips_for_its_user() {
        let user_id = Uuid::new_v4();
        let state = sign_oauth_state(user_id, 600, SECRET).unwrap();
        assert_eq!(verify_oauth_state(&state, SECRET).unwrap(), user_id);
    }

    #[test]
    fn tampered_or_expired_state_is_rejected() {
        let state = sign_oauth_state(Uuid::new_v4(), 600, SECRET).unwrap();
        let tampered = state.replacen(&state[..8], "00000000", 1);
        assert!(verify_oauth_state(&tampered, SECRET).is_err());
        assert!(verify_oauth_state(&state, b"another-secret-key-min-32-characters").is_err());

        let expired = sign_oauth_state(Uuid::new_v4(), -10, SECRET).unwrap();
        assert!(verify_oauth_state(&expired, SECRET).is_err());
    }
}
