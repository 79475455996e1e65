//! EmotiCat API Service
//!
//! REST API for user accounts, pet profiles and AI-assisted cat emotion analysis

use anyhow::{Context, Result};
use emoticat_api::{create_router, AppState, Config, OpenAiClient, S3BlobStore, Storage};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emoticat_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting EmotiCat API");
    info!("Model: {} at {}", config.openai_model, config.openai_api_base);
    info!("Bucket: {}", config.s3_bucket);

    // Postgres pool and schema
    let storage = Storage::new(&config.database_url, config.database_max_connections).await?;
    storage.init_schema().await?;

    // Object storage for pet photos
    let blobs = S3BlobStore::new(&config).await?;

    // Model provider for classification and guidance
    let provider = OpenAiClient::new(&config)?;

    // Create application state
    let state = AppState::new(
        &config,
        Arc::new(storage),
        Arc::new(blobs),
        Arc::new(provider),
    );

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("EmotiCat API running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
