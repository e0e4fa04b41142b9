use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
    /// Present on refresh tokens so two issued in the same second still differ.
    #[serde(default)]
    pub jti: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

fn sign(claims: &Claims, config: &Config) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
}

fn claims_for(user_id: Uuid, email: &str, token_type: TokenType, config: &Config) -> Claims {
    let now = Utc::now();
    let (ttl, jti) = match token_type {
        TokenType::Access => (config.jwt_access_ttl_secs, None),
        TokenType::Refresh => (config.jwt_refresh_ttl_secs, Some(Uuid::new_v4())),
    };

    Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (now + Duration::seconds(ttl)).timestamp(),
        iat: now.timestamp(),
        token_type,
        jti,
    }
}

pub fn create_access_token(user_id: Uuid, email: &str, config: &Config) -> AppResult<String> {
    sign(&claims_for(user_id, email, TokenType::Access, config), config)
}

pub fn create_refresh_token(user_id: Uuid, email: &str, config: &Config) -> AppResult<String> {
    sign(&claims_for(user_id, email, TokenType::Refresh, config), config)
}

pub fn create_token_pair(user_id: Uuid, email: &str, config: &Config) -> AppResult<TokenPair> {
    Ok(TokenPair {
        access_token: create_access_token(user_id, email, config)?,
        refresh_token: create_refresh_token(user_id, email, config)?,
        token_type: "bearer",
        expires_in: config.jwt_access_ttl_secs,
    })
}

/// SHA-256 of a raw token, lowercase hex. Only this hash is stored.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_token(token: &str, config: &Config) -> AppResult<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pair_round_trip() {
        let config = Config::for_tests();
        let user_id = Uuid::new_v4();
        let pair = create_token_pair(user_id, "a@example.com", &config).unwrap();

        let access = verify_token(&pair.access_token, &config).unwrap().claims;
        assert_eq!(access.sub, user_id);
        assert_eq!(access.token_type, TokenType::Access);
        assert!(access.jti.is_none());

        let refresh = verify_token(&pair.refresh_token, &config).unwrap().claims;
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(refresh.jti.is_some());
        assert_eq!(pair.expires_in, 1800);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let config = Config::for_tests();
        let token = create_access_token(Uuid::new_v4(), "a@example.com", &config).unwrap();

        let mut other = Config::for_tests();
        other.jwt_secret = "different".into();
        assert!(matches!(
            verify_token(&token, &other),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut config = Config::for_tests();
        config.jwt_access_ttl_secs = -3600;
        let token = create_access_token(Uuid::new_v4(), "a@example.com", &config).unwrap();
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn test_hash_token_deterministic() {
        let h1 = hash_token("test-refresh-token-value");
        let h2 = hash_token("test-refresh-token-value");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, hash_token("token-b"));
    }
}
