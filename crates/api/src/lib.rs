//! EmotiCat API Service
//!
//! Backend for the EmotiCat app: user accounts, pet profiles, photo storage
//! and a two-step model pipeline that names a cat's emotion and turns it into
//! care guidance.

pub mod ai;
pub mod analysis;
pub mod auth;
pub mod blob_store;
pub mod config;
pub mod handlers;
pub mod models;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use ai::{AnalysisProvider, OpenAiClient};
pub use analysis::{AnalysisOutcome, EmotionAnalyzer};
pub use auth::{AuthUser, Tokens};
pub use blob_store::{BlobStore, S3BlobStore};
pub use config::{Config, ImageTransport};
pub use storage::{Datastore, Storage};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub blobs: Arc<dyn BlobStore>,
    pub analyzer: EmotionAnalyzer,
    pub tokens: Tokens,
    pub image_transport: ImageTransport,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn Datastore>,
        blobs: Arc<dyn BlobStore>,
        provider: Arc<dyn AnalysisProvider>,
    ) -> Self {
        let analyzer = EmotionAnalyzer::new(provider, blobs.clone(), store.clone());

        AppState {
            store,
            blobs,
            analyzer,
            tokens: Tokens::new(config),
            image_transport: config.image_transport,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/auth/register", post(handlers::auth::register_handler))
        .route("/api/auth/login", post(handlers::auth::login_handler))
        .route(
            "/api/auth/refresh-token",
            post(handlers::auth::refresh_token_handler),
        )
        .route("/api/pets", get(handlers::pets::list_pets_handler))
        .route("/api/pets/add", post(handlers::pets::add_pet_handler))
        .route("/api/pets/{pet_id}", get(handlers::pets::pet_details_handler))
        .route(
            "/api/pets/image/{*image_key}",
            get(handlers::pets::pet_image_handler),
        )
        .route("/api/cats/analyze", post(handlers::cats::analyze_handler))
        .with_state(shared_state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
