use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::database::models::User;
use crate::database::Repository;
use crate::error::ApiError;

pub mod guard;

pub use guard::require_authorized_admin;

/// Session token claims. The token only identifies the user; email and
/// superuser status are reloaded from the database on every request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, username: String) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            username,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

/// Convenience for the CLI and tests: mint a session token for `user`.
pub fn session_token_for(user: &User) -> Result<String, JwtError> {
    generate_jwt(&Claims::new(user.id, user.username.clone()))
}

/// Resolve a token into the live user record.
pub async fn authenticate(repo: &dyn Repository, token: &str) -> Result<Option<User>, ApiError> {
    let claims = match validate_jwt(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejected session token: {}", e);
            return Ok(None);
        }
    };

    let user = repo.get_user(claims.sub).await?;
    if user.is_none() {
        tracing::warn!("Session token for unknown user '{}' ({})", claims.username, claims.sub);
    }
    Ok(user)
}
