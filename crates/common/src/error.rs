use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("The image does not appear to contain a cat")]
    NotACat,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Pet not found")]
    PetNotFound,

    #[error("Image not found")]
    ImageNotFound,

    #[error("Access denied")]
    AccessDenied,

    #[error("Model returned an unrecognized emotion: {0}")]
    UnknownEmotion(String),

    #[error("Model request failed: {0}")]
    Model(String),

    #[error("Malformed model response: {0}")]
    MalformedModelResponse(String),

    #[error("Object storage error: {0}")]
    Blob(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
