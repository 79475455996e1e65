//! R2 / S3-compatible object storage for pet photos

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use emoticat_common::{Error, Result};
use tracing::info;

use crate::config::Config;

/// Object storage operations the API needs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key` with the given content type
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Fetch the bytes and content type stored under `key`
    async fn get(&self, key: &str) -> Result<(Vec<u8>, String)>;
}

/// Pet photo storage in an R2 / S3-compatible bucket
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    /// Build a client for the configured bucket.
    ///
    /// Credentials come from the standard AWS environment variables.
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = config.s3_endpoint_url.clone() {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());

        info!("Using object storage bucket: {}", config.s3_bucket);

        Ok(Self {
            client,
            bucket: config.s3_bucket.clone(),
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| Error::Blob(DisplayErrorContext(e).to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<(Vec<u8>, String)> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    Error::ImageNotFound
                } else {
                    Error::Blob(DisplayErrorContext(service_error).to_string())
                }
            })?;

        let content_type = output
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Blob(e.to_string()))?;

        Ok((data.into_bytes().to_vec(), content_type))
    }
}
