//! Emotion analysis endpoint

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::StatusCode;
use axum::Json;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use emoticat_common::EmotionGuidance;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::auth::AuthUser;
use crate::config::ImageTransport;
use crate::handlers::ApiError;
use crate::AppState;

/// JSON body accepted when the base64 transport is configured
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeJsonRequest {
    pub pet_id: Option<i64>,
    pub image: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub message: String,
    pub emotion_details: EmotionGuidance,
    pub image_key: Option<String>,
}

/// Run the two-step analysis pipeline on an uploaded photo
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    request: Request,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (pet_id, image, content_type) = match state.image_transport {
        ImageTransport::Multipart => read_multipart(request).await?,
        ImageTransport::Base64 => read_base64_json(request).await?,
    };

    info!(
        "Analyzing photo for pet {} ({} bytes) from user {}",
        pet_id,
        image.len(),
        user.id
    );

    let outcome = state
        .analyzer
        .analyze(user.id, pet_id, image, &content_type)
        .await
        .map_err(|e| {
            error!("Analysis failed for pet {}: {}", pet_id, e);
            ApiError::from(e)
        })?;

    Ok(Json(AnalyzeResponse {
        message: outcome.emotion.to_string(),
        emotion_details: outcome.guidance,
        image_key: outcome.image_key,
    }))
}

async fn read_multipart(request: Request) -> Result<(i64, Vec<u8>, String), ApiError> {
    let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid multipart body: {}", e),
        )
    })?;

    let mut pet_id: Option<i64> = None;
    let mut image: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid multipart body: {}", e),
        )
    })? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "petId" => {
                let raw = field.text().await.map_err(|e| {
                    ApiError::new(
                        StatusCode::BAD_REQUEST,
                        format!("Invalid multipart body: {}", e),
                    )
                })?;
                pet_id = Some(raw.trim().parse().map_err(|_| {
                    ApiError::new(StatusCode::BAD_REQUEST, "petId must be a number")
                })?);
            }
            "image" => {
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::new(
                        StatusCode::BAD_REQUEST,
                        format!("Invalid multipart body: {}", e),
                    )
                })?;
                image = Some((bytes.to_vec(), content_type));
            }
            _ => {}
        }
    }

    match (pet_id, image) {
        (Some(pet_id), Some((bytes, content_type))) => Ok((pet_id, bytes, content_type)),
        _ => Err(missing_inputs()),
    }
}

async fn read_base64_json(request: Request) -> Result<(i64, Vec<u8>, String), ApiError> {
    let Json(payload) = Json::<AnalyzeJsonRequest>::from_request(request, &())
        .await
        .map_err(super::bad_json)?;

    let (Some(pet_id), Some(encoded)) = (payload.pet_id, payload.image) else {
        return Err(missing_inputs());
    };

    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Image must be valid base64"))?;

    let content_type = payload
        .content_type
        .unwrap_or_else(|| "image/jpeg".to_string());

    Ok((pet_id, bytes, content_type))
}

fn missing_inputs() -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "Image and petId are required")
}
