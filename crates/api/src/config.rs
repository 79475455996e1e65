//! Configuration management for the EmotiCat API
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// How clients deliver the photo to the analyze endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageTransport {
    /// multipart/form-data with an `image` file field
    #[default]
    Multipart,
    /// JSON body carrying the image as a base64 string
    Base64,
}

impl FromStr for ImageTransport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "multipart" => Ok(ImageTransport::Multipart),
            "base64" => Ok(ImageTransport::Base64),
            other => anyhow::bail!("Unknown image transport: {}", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Postgres connection string
    pub database_url: String,

    /// Connection pool size
    pub database_max_connections: u32,

    /// Endpoint of the R2 / S3-compatible store; None uses the SDK default
    pub s3_endpoint_url: Option<String>,

    /// Bucket holding pet photos
    pub s3_bucket: String,

    /// Region name; R2 uses "auto"
    pub s3_region: String,

    /// Base URL of the OpenAI-compatible API
    pub openai_api_base: String,

    /// API key for the model provider
    pub openai_api_key: String,

    /// Model used for both classification and guidance
    pub openai_model: String,

    /// Timeout for model requests, in seconds
    pub openai_timeout_secs: u64,

    /// Secret for signing access tokens
    pub jwt_secret: String,

    /// Secret for signing refresh tokens
    pub jwt_refresh_secret: String,

    /// Access token lifetime, in minutes
    pub access_token_ttl_mins: i64,

    /// Refresh token lifetime, in days
    pub refresh_token_ttl_days: i64,

    /// How the analyze endpoint receives images
    pub image_transport: ImageTransport,

    /// Maximum accepted request body size
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            database_url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,

            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,

            s3_endpoint_url: env::var("S3_ENDPOINT_URL").ok(),

            s3_bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "emoticat".to_string()),

            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string()),

            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),

            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is required")?,

            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),

            openai_timeout_secs: env::var("OPENAI_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("Invalid OPENAI_TIMEOUT_SECS")?,

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,

            jwt_refresh_secret: env::var("JWT_REFRESH_SECRET")
                .context("JWT_REFRESH_SECRET is required")?,

            access_token_ttl_mins: env::var("ACCESS_TOKEN_TTL_MINS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .context("Invalid ACCESS_TOKEN_TTL_MINS")?,

            refresh_token_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("Invalid REFRESH_TOKEN_TTL_DAYS")?,

            image_transport: env::var("IMAGE_TRANSPORT")
                .unwrap_or_else(|_| "multipart".to_string())
                .parse()
                .context("Invalid IMAGE_TRANSPORT")?,

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (50 * 1024 * 1024).to_string())
                .parse()
                .context("Invalid MAX_UPLOAD_BYTES")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be greater than 0");
        }

        if self.access_token_ttl_mins <= 0 {
            anyhow::bail!("ACCESS_TOKEN_TTL_MINS must be greater than 0");
        }

        if self.refresh_token_ttl_days <= 0 {
            anyhow::bail!("REFRESH_TOKEN_TTL_DAYS must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[cfg(test)]
impl Config {
    /// Baseline configuration for unit tests
    pub(crate) fn for_tests() -> Self {
        Config {
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            database_url: "postgres://localhost/emoticat".to_string(),
            database_max_connections: 5,
            s3_endpoint_url: None,
            s3_bucket: "emoticat".to_string(),
            s3_region: "auto".to_string(),
            openai_api_base: "https://api.openai.com/v1".to_string(),
            openai_api_key: "test-key".to_string(),
            openai_model: "gpt-4o".to_string(),
            openai_timeout_secs: 120,
            jwt_secret: "access-secret".to_string(),
            jwt_refresh_secret: "refresh-secret".to_string(),
            access_token_ttl_mins: 15,
            refresh_token_ttl_days: 7,
            image_transport: ImageTransport::Multipart,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}
