//! API request handlers

pub mod auth;
pub mod cats;
pub mod pets;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use emoticat_common::Error;

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => serde_json::json!({
                "error": self.message,
                "details": details,
            }),
            None => serde_json::json!({
                "error": self.message
            }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
            details: None,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::MissingField(_) | Error::NotACat => {
                ApiError::new(StatusCode::BAD_REQUEST, err.to_string())
            }

            Error::EmailTaken => ApiError::new(StatusCode::CONFLICT, err.to_string()),

            Error::PetNotFound | Error::ImageNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, err.to_string())
            }

            Error::AccessDenied => ApiError::new(StatusCode::FORBIDDEN, err.to_string()),

            // Upstream model failures; the detail is logged, not exposed.
            Error::UnknownEmotion(_) | Error::Model(_) | Error::MalformedModelResponse(_) => {
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    "The analysis service returned an unusable response",
                )
            }

            Error::Blob(_) | Error::Database(_) | Error::JsonSerialization(_) | Error::Other(_) => {
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "An internal error occurred".to_string(),
                    details: Some(err.to_string()),
                }
            }
        }
    }
}

/// Map a JSON extractor rejection onto the standard error body
pub(crate) fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::new(rejection.status(), rejection.body_text())
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "emoticat-api"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::from(Error::NotACat).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::EmailTaken).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(Error::PetNotFound).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(Error::AccessDenied).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(Error::Model("timeout".to_string())).status,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(Error::Database("down".to_string())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_upstream_detail_is_not_exposed() {
        let api_error = ApiError::from(Error::Model("secret internal detail".to_string()));
        assert!(!api_error.message.contains("secret internal detail"));
        assert!(api_error.details.is_none());
    }
}
