//! Account registration, login and token refresh

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, Json};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::handlers::{bad_json, ApiError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Create an account and issue the first token pair
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(payload) = payload.map_err(bad_json)?;

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Email and password are required",
        ));
    }

    info!("Registering user: {}", payload.email);

    let password_hash = crate::auth::hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(&payload.email, &password_hash)
        .await?;

    let access_token = state.tokens.issue_access(user.id, &user.email)?;
    let refresh_token = state.tokens.issue_refresh(user.id, &user.email)?;
    state.store.set_refresh_token(user.id, &refresh_token).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            email: user.email,
            access_token,
            refresh_token,
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// Verify credentials and issue a fresh token pair
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload.map_err(bad_json)?;

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Email and password are required",
        ));
    }

    info!("Login attempt: {}", payload.email);

    let user = state
        .store
        .user_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "User not found"))?;

    if !crate::auth::verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Invalid password"));
    }

    let access_token = state.tokens.issue_access(user.id, &user.email)?;
    let refresh_token = state.tokens.issue_refresh(user.id, &user.email)?;
    state.store.set_refresh_token(user.id, &refresh_token).await?;

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        email: user.email,
    }))
}

/// Exchange a valid refresh token for a new access token
pub async fn refresh_token_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Json(payload) = payload.map_err(bad_json)?;

    if payload.refresh_token.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Refresh token is required",
        ));
    }

    let claims = state
        .tokens
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => {
                ApiError::new(StatusCode::UNAUTHORIZED, "Refresh token expired")
            }
            _ => ApiError::new(StatusCode::UNAUTHORIZED, "Invalid refresh token"),
        })?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Invalid refresh token"))?;

    // The presented token must still be the one on record; rotation on
    // login invalidates older refresh tokens.
    let user = match state.store.user_by_id(user_id).await? {
        Some(user) if user.refresh_token.as_deref() == Some(payload.refresh_token.as_str()) => user,
        _ => return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid refresh token")),
    };

    let access_token = state.tokens.issue_access(user.id, &user.email)?;

    Ok(Json(RefreshResponse { access_token }))
}
