//! Pet profile endpoints

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::NaiveDate;
use emoticat_common::Error;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::handlers::ApiError;
use crate::models::{Pet, PetDetails};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AddPetResponse {
    pub pet: Pet,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_data: String,
    pub content_type: String,
}

/// List the caller's pets
pub async fn list_pets_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Pet>>, ApiError> {
    let pets = state.store.pets_for_user(user.id).await?;

    Ok(Json(pets))
}

/// Create a pet profile, with an optional photo
pub async fn add_pet_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AddPetResponse>), ApiError> {
    let mut name: Option<String> = None;
    let mut breed: Option<String> = None;
    let mut birthday: Option<NaiveDate> = None;
    let mut image: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(read_text(field).await?),
            "breed" => breed = Some(read_text(field).await?),
            "birthday" => {
                let raw = read_text(field).await?;
                if !raw.is_empty() {
                    birthday = Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(
                        |_| ApiError::new(StatusCode::BAD_REQUEST, "Birthday must be YYYY-MM-DD"),
                    )?);
                }
            }
            "image" => {
                let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                image = Some((bytes.to_vec(), content_type));
            }
            _ => {}
        }
    }

    let name = match name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(Error::MissingField("Name").into()),
    };

    info!("Adding pet {} for user {}", name, user.id);

    // The photo goes to object storage first; the profile row then points
    // at the stored key.
    let mut image_key = None;
    if let Some((bytes, content_type)) = image {
        let key = format!("pet-images/{}.jpg", Uuid::new_v4());
        state.blobs.put(&key, bytes, &content_type).await?;
        image_key = Some(key);
    }

    let pet = state
        .store
        .insert_pet(
            user.id,
            &name,
            breed.as_deref().filter(|b| !b.is_empty()),
            birthday,
            image_key.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(AddPetResponse { pet })))
}

/// A pet profile with its full emotion history
pub async fn pet_details_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(pet_id): Path<i64>,
) -> Result<Json<PetDetails>, ApiError> {
    let pet = state
        .store
        .pet_for_user(pet_id, user.id)
        .await?
        .ok_or(Error::PetNotFound)?;

    let emotion_history = state.store.emotion_history(pet.id).await?;

    Ok(Json(PetDetails {
        pet,
        emotion_history,
    }))
}

/// Fetch a stored photo as a base64 data URL
pub async fn pet_image_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(image_key): Path<String>,
) -> Result<Json<ImageResponse>, ApiError> {
    // Denied and nonexistent keys are indistinguishable to the caller.
    if !state.store.user_may_read_image(user.id, &image_key).await? {
        return Err(Error::AccessDenied.into());
    }

    let (bytes, content_type) = state.blobs.get(&image_key).await?;

    Ok(Json(ImageResponse {
        image_data: format!("data:{};base64,{}", content_type, BASE64.encode(&bytes)),
        content_type,
    }))
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(bad_multipart)
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        format!("Invalid multipart body: {}", e),
    )
}
