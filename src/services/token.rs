//! Signed bearer tokens (HS256) carrying the user id and role.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::domain::{Actor, Role};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid or expired token")]
    Invalid,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a string.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        let hours = i64::try_from(config.token_ttl_hours).unwrap_or(i64::MAX / 3600);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(hours),
        }
    }

    pub fn issue(&self, user_id: i32, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Actor, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| TokenError::Invalid)?;

        let id = data.claims.sub.parse().map_err(|_| TokenError::Invalid)?;
        Ok(Actor {
            id,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            ..AuthConfig::default()
        })
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service("k1");
        let token = tokens.issue(7, Role::Tech).unwrap();
        assert_eq!(
            tokens.verify(&token),
            Ok(Actor {
                id: 7,
                role: Role::Tech
            })
        );
    }

    #[test]
    fn foreign_signature_rejected() {
        let token = service("k1").issue(1, Role::Admin).unwrap();
        assert_eq!(service("k2").verify(&token), Err(TokenError::Invalid));
        assert_eq!(service("k1").verify("garbage"), Err(TokenError::Invalid));
    }

    #[test]
    fn expired_token_rejected() {
        let tokens = service("k1");
        let claims = Claims {
            sub: "1".to_string(),
            role: Role::Admin,
            iat: 0,
            exp: 1,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &tokens.encoding).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Invalid));
    }
}
