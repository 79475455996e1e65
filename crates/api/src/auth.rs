//! Password hashing and bearer-token authentication
//!
//! Access and refresh tokens are signed with separate secrets; the refresh
//! token currently valid for a user is also persisted on the user row and
//! must match on refresh.

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::handlers::ApiError;
use crate::AppState;

/// Hash a password for storage
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;

    Ok(hash.to_string())
}

/// Check a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("Invalid password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Claims carried by both access and refresh tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    fn new(user_id: i64, email: &str, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// Numeric user id from `sub`
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Issues and verifies the two token kinds
pub struct Tokens {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl Tokens {
    pub fn new(config: &Config) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_ttl_mins),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a short-lived access token
    pub fn issue_access(&self, user_id: i64, email: &str) -> anyhow::Result<String> {
        let claims = Claims::new(user_id, email, self.access_ttl);
        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| anyhow!("Failed to sign access token: {}", e))
    }

    /// Sign a long-lived refresh token
    pub fn issue_refresh(&self, user_id: i64, email: &str) -> anyhow::Result<String> {
        let claims = Claims::new(user_id, email, self.refresh_ttl);
        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| anyhow!("Failed to sign refresh token: {}", e))
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.access_decoding, &self.validation).map(|data| data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.refresh_decoding, &self.validation).map(|data| data.claims)
    }
}

/// Authenticated caller, extracted from the Authorization bearer header
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError::new(StatusCode::UNAUTHORIZED, "Missing authorization token")
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::new(StatusCode::UNAUTHORIZED, "Missing authorization token")
        })?;

        let claims = state
            .tokens
            .verify_access(token)
            .map_err(|_| ApiError::new(StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        let id = claims
            .user_id()
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        Ok(AuthUser {
            id,
            email: claims.email,
        })
    }
}
