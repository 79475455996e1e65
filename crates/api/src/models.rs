//! Data models for the EmotiCat API
//!
//! Row types mirror the database schema; the composed read models are what
//! the endpoints serialize.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
}

/// A pet profile owned by a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pet {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub breed: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub image_key: Option<String>,
}

/// One completed emotion analysis
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmotionRecord {
    pub id: i64,
    pub pet_id: i64,
    pub emotion: String,
    pub emotion_text: Option<String>,
    pub image_key: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An emotion record together with its ordered tips
#[derive(Debug, Clone, Serialize)]
pub struct EmotionHistoryEntry {
    #[serde(flatten)]
    pub record: EmotionRecord,
    pub tips_and_recs: Vec<String>,
}

/// A pet profile with its full analysis history, newest first
#[derive(Debug, Clone, Serialize)]
pub struct PetDetails {
    #[serde(flatten)]
    pub pet: Pet,
    #[serde(rename = "emotionHistory")]
    pub emotion_history: Vec<EmotionHistoryEntry>,
}
