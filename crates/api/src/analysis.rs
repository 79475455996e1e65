//! Cat emotion analysis pipeline
//!
//! Orchestrates one analysis run: ownership check, classification, photo
//! upload, guidance, then a single transactional write. A sentinel
//! classification or any failing step aborts the run before the next step;
//! nothing is persisted unless every step succeeded.

use emoticat_common::{Classification, Emotion, EmotionGuidance, Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::AnalysisProvider;
use crate::blob_store::BlobStore;
use crate::storage::Datastore;

/// Result of a completed analysis
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub record_id: i64,
    pub emotion: Emotion,
    pub guidance: EmotionGuidance,
    pub image_key: Option<String>,
}

/// Runs the two model calls and the writes for one uploaded photo
pub struct EmotionAnalyzer {
    provider: Arc<dyn AnalysisProvider>,
    blobs: Arc<dyn BlobStore>,
    store: Arc<dyn Datastore>,
}

impl EmotionAnalyzer {
    pub fn new(
        provider: Arc<dyn AnalysisProvider>,
        blobs: Arc<dyn BlobStore>,
        store: Arc<dyn Datastore>,
    ) -> Self {
        Self {
            provider,
            blobs,
            store,
        }
    }

    /// Analyze one photo of a pet owned by `user_id`
    pub async fn analyze(
        &self,
        user_id: i64,
        pet_id: i64,
        image: Vec<u8>,
        content_type: &str,
    ) -> Result<AnalysisOutcome> {
        // The pet must exist and belong to the caller before anything
        // leaves the process.
        if self.store.pet_for_user(pet_id, user_id).await?.is_none() {
            return Err(Error::PetNotFound);
        }

        debug!("Classifying emotion for pet {}", pet_id);
        let emotion = match self.provider.classify_emotion(&image, content_type).await? {
            Classification::Emotion(emotion) => emotion,
            Classification::NotACat => return Err(Error::NotACat),
        };
        info!("Pet {} classified as {}", pet_id, emotion);

        // Every analysis gets a fresh key; nothing is ever overwritten.
        let image_key = format!("pet-images/{}.jpg", Uuid::new_v4());
        self.blobs.put(&image_key, image, content_type).await?;
        debug!("Uploaded photo as {}", image_key);

        let guidance = self.provider.emotion_guidance(emotion).await.map_err(|e| {
            warn!("Guidance failed after upload; photo {} is orphaned", image_key);
            e
        })?;

        let record = self
            .store
            .record_analysis(pet_id, emotion, &guidance, Some(&image_key))
            .await
            .map_err(|e| {
                warn!("Analysis write failed; photo {} is orphaned", image_key);
                e
            })?;

        info!("Recorded analysis {} for pet {}", record.id, pet_id);

        Ok(AnalysisOutcome {
            record_id: record.id,
            emotion,
            guidance,
            image_key: record.image_key,
        })
    }
}
