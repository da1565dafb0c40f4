use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdToken {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub expires_in: i64,
}

pub fn create_id_token(user_id: &str, email: &str, config: &Config) -> AppResult<IdToken> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (now + Duration::seconds(config.jwt_ttl_secs)).timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create id token: {}", e)))?;

    Ok(IdToken {
        user_id: user_id.to_string(),
        email: email.to_string(),
        id_token: token,
        expires_in: config.jwt_ttl_secs,
    })
}

/// Compute SHA-256 hash of a raw token string, returned as lowercase hex.
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
    .map_err(|_| AppError::Unauthenticated)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: String::new(),
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        jwt_secret: "test-secret".into(),
        jwt_ttl_secs: 3600,
        password_reset_ttl_secs: 3600,
        password_reset_webhook_url: None,
        auth_rate_limit_per_minute: 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_token_round_trip() {
        let config = test_config();
        let issued = create_id_token("u1", "a@b.com", &config).unwrap();
        let data = verify_token(&issued.id_token, &config).unwrap();
        assert_eq!(data.claims.sub, "u1");
        assert_eq!(data.claims.email, "a@b.com");
        assert_eq!(issued.expires_in, 3600);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issued = create_id_token("u1", "a@b.com", &test_config()).unwrap();
        let other = Config {
            jwt_secret: "different".into(),
            ..test_config()
        };
        assert!(matches!(
            verify_token(&issued.id_token, &other),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn test_hash_token_deterministic() {
        let token = "reset-token-value";
        let h1 = hash_token(token);
        let h2 = hash_token(token);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex = 64 chars
    }

    #[test]
    fn test_hash_token_different_inputs() {
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }
}
