use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config;
use crate::types::{ObjectId, Role};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: ObjectId,
    pub school_id: ObjectId,
    pub role: Role,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: ObjectId, school_id: ObjectId, role: Role, name: String) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.session_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user_id,
            school_id,
            role,
            name,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("session token generation error: {0}")]
    TokenGeneration(String),
    #[error("invalid session secret")]
    InvalidSecret,
    #[error("invalid session token: {0}")]
    InvalidToken(String),
}

pub fn generate_session_token(claims: Claims) -> Result<String, SessionTokenError> {
    let secret = &config::config().security.session_secret;

    if secret.is_empty() {
        return Err(SessionTokenError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| SessionTokenError::TokenGeneration(e.to_string()))
}

pub fn verify_session_token(token: &str) -> Result<Claims, SessionTokenError> {
    let secret = &config::config().security.session_secret;

    if secret.is_empty() {
        return Err(SessionTokenError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| SessionTokenError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Salted SHA-256 password digest, hex-encoded.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    // Compare digests rather than raw strings so length never leaks
    hash_password(password, salt) == stored_hash
}

pub fn generate_salt() -> String {
    hex::encode(uuid::Uuid::new_v4().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let salt = generate_salt();
        let hash = hash_password("s3cret!", &salt);
        assert!(verify_password("s3cret!", &salt, &hash));
        assert!(!verify_password("wrong", &salt, &hash));
    }

    #[test]
    fn same_password_different_salt_differs() {
        let a = hash_password("pw", "salt-a");
        let b = hash_password("pw", "salt-b");
        assert_ne!(a, b);
    }
}
