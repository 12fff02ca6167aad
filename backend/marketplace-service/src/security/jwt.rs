//! Bearer token issuance and validation.
//!
//! Tokens are HS256, signed with the configured secret. Keys are derived
//! once at startup and held in a process-wide cell so handlers and
//! middleware share them without threading state through every call.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a UUID string
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

lazy_static! {
    static ref JWT_KEYS: RwLock<Option<(EncodingKey, DecodingKey)>> = RwLock::new(None);
}

/// Install the signing keys. Must be called once at startup before any
/// token is issued or validated.
pub fn initialize_keys(secret: &str) {
    let keys = (
        EncodingKey::from_secret(secret.as_bytes()),
        DecodingKey::from_secret(secret.as_bytes()),
    );
    let mut guard = JWT_KEYS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Some(keys);
}

/// Generate a random secret for deployments that never configured one.
/// Tokens signed with it do not survive a restart.
pub fn generate_ephemeral_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn generate_access_token(user_id: Uuid, ttl_minutes: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::minutes(ttl_minutes)).timestamp(),
    };

    let guard = JWT_KEYS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let (encoding_key, _) = guard
        .as_ref()
        .ok_or_else(|| AppError::Internal("JWT keys not initialized".to_string()))?;

    Ok(encode(&Header::new(Algorithm::HS256), &claims, encoding_key)?)
}

pub fn validate_token(token: &str) -> Result<jsonwebtoken::TokenData<Claims>> {
    let guard = JWT_KEYS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let (_, decoding_key) = guard
        .as_ref()
        .ok_or_else(|| AppError::Internal("JWT keys not initialized".to_string()))?;

    Ok(decode::<Claims>(
        token,
        decoding_key,
        &Validation::new(Algorithm::HS256),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        initialize_keys("test-secret-for-unit-tests");
    }

    #[test]
    fn test_token_round_trip() {
        init();
        let user_id = Uuid::new_v4();
        let token = generate_access_token(user_id, 60).unwrap();
        let data = validate_token(&token).unwrap();
        assert_eq!(data.claims.sub, user_id.to_string());
        assert!(data.claims.exp > data.claims.iat);
    }

    #[test]
    fn test_garbage_token_rejected() {
        init();
        assert!(validate_token("not.a.token").is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        init();
        let token = generate_access_token(Uuid::new_v4(), 60).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(validate_token(&tampered).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        init();
        // Negative TTL puts exp in the past, beyond the default leeway
        let token = generate_access_token(Uuid::new_v4(), -120).unwrap();
        assert!(validate_token(&token).is_err());
    }

    #[test]
    fn test_ephemeral_secret_is_random() {
        let a = generate_ephemeral_secret();
        let b = generate_ephemeral_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
