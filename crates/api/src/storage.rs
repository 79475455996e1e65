//! PostgreSQL persistence for users, pets and analysis results

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use emoticat_common::{Emotion, EmotionGuidance, Error, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;

use crate::models::{EmotionHistoryEntry, EmotionRecord, Pet, User};

/// Persistence operations the API needs
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Insert a new account
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User>;

    /// Look up an account by email
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Look up an account by id
    async fn user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Store the currently valid refresh token for a user
    async fn set_refresh_token(&self, user_id: i64, token: &str) -> Result<()>;

    /// All pets owned by a user
    async fn pets_for_user(&self, user_id: i64) -> Result<Vec<Pet>>;

    /// Insert a new pet profile
    async fn insert_pet(
        &self,
        user_id: i64,
        name: &str,
        breed: Option<&str>,
        birthday: Option<NaiveDate>,
        image_key: Option<&str>,
    ) -> Result<Pet>;

    /// A pet, only if it belongs to the given user
    async fn pet_for_user(&self, pet_id: i64, user_id: i64) -> Result<Option<Pet>>;

    /// Analysis history for a pet, newest first, tips in insertion order
    async fn emotion_history(&self, pet_id: i64) -> Result<Vec<EmotionHistoryEntry>>;

    /// Write an emotion record and its tips in one transaction
    async fn record_analysis(
        &self,
        pet_id: i64,
        emotion: Emotion,
        guidance: &EmotionGuidance,
        image_key: Option<&str>,
    ) -> Result<EmotionRecord>;

    /// Whether an image key is referenced by any pet or record the user owns
    async fn user_may_read_image(&self, user_id: i64, image_key: &str) -> Result<bool>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(100) UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    refresh_token TEXT
);

CREATE TABLE IF NOT EXISTS pets (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id),
    name VARCHAR(100) NOT NULL,
    breed VARCHAR(100),
    birthday DATE,
    image_key TEXT
);

CREATE TABLE IF NOT EXISTS emotion_records (
    id BIGSERIAL PRIMARY KEY,
    pet_id BIGINT NOT NULL REFERENCES pets(id),
    emotion VARCHAR(50) NOT NULL,
    emotion_text TEXT,
    image_key TEXT,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS tips_and_recs (
    id BIGSERIAL PRIMARY KEY,
    emotion_record_id BIGINT NOT NULL REFERENCES emotion_records(id),
    tip TEXT NOT NULL
);
"#;

fn db(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}

/// Postgres-backed datastore
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    /// Connect to Postgres
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to Postgres")?;

        info!("Connected to Postgres");

        Ok(Self { pool })
    }

    /// Create the tables if they do not exist yet
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to initialize database schema")?;

        info!("Database schema ready");

        Ok(())
    }
}

#[async_trait]
impl Datastore for Storage {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) \
             RETURNING id, email, password_hash, refresh_token",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                Error::EmailTaken
            }
            _ => db(e),
        })
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, refresh_token FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, refresh_token FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)
    }

    async fn set_refresh_token(&self, user_id: i64, token: &str) -> Result<()> {
        sqlx::query("UPDATE users SET refresh_token = $1 WHERE id = $2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db)?;

        Ok(())
    }

    async fn pets_for_user(&self, user_id: i64) -> Result<Vec<Pet>> {
        sqlx::query_as::<_, Pet>(
            "SELECT id, user_id, name, breed, birthday, image_key \
             FROM pets WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)
    }

    async fn insert_pet(
        &self,
        user_id: i64,
        name: &str,
        breed: Option<&str>,
        birthday: Option<NaiveDate>,
        image_key: Option<&str>,
    ) -> Result<Pet> {
        sqlx::query_as::<_, Pet>(
            "INSERT INTO pets (user_id, name, breed, birthday, image_key) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, name, breed, birthday, image_key",
        )
        .bind(user_id)
        .bind(name)
        .bind(breed)
        .bind(birthday)
        .bind(image_key)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn pet_for_user(&self, pet_id: i64, user_id: i64) -> Result<Option<Pet>> {
        sqlx::query_as::<_, Pet>(
            "SELECT id, user_id, name, breed, birthday, image_key \
             FROM pets WHERE id = $1 AND user_id = $2",
        )
        .bind(pet_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)
    }

    async fn emotion_history(&self, pet_id: i64) -> Result<Vec<EmotionHistoryEntry>> {
        let records: Vec<EmotionRecord> = sqlx::query_as(
            "SELECT id, pet_id, emotion, emotion_text, image_key, timestamp \
             FROM emotion_records WHERE pet_id = $1 \
             ORDER BY timestamp DESC, id DESC",
        )
        .bind(pet_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = records.iter().map(|record| record.id).collect();

        let tips: Vec<(i64, String)> = sqlx::query_as(
            "SELECT emotion_record_id, tip FROM tips_and_recs \
             WHERE emotion_record_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut by_record: HashMap<i64, Vec<String>> = HashMap::new();
        for (record_id, tip) in tips {
            by_record.entry(record_id).or_default().push(tip);
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let tips_and_recs = by_record.remove(&record.id).unwrap_or_default();
                EmotionHistoryEntry {
                    record,
                    tips_and_recs,
                }
            })
            .collect())
    }

    async fn record_analysis(
        &self,
        pet_id: i64,
        emotion: Emotion,
        guidance: &EmotionGuidance,
        image_key: Option<&str>,
    ) -> Result<EmotionRecord> {
        // Dropping the transaction before commit rolls it back, so a failed
        // tip insert cannot leave a record without its tips.
        let mut tx = self.pool.begin().await.map_err(db)?;

        let record: EmotionRecord = sqlx::query_as(
            "INSERT INTO emotion_records (pet_id, emotion, emotion_text, image_key) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, pet_id, emotion, emotion_text, image_key, timestamp",
        )
        .bind(pet_id)
        .bind(emotion.label())
        .bind(&guidance.description)
        .bind(image_key)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;

        for tip in &guidance.tips_and_recs {
            sqlx::query("INSERT INTO tips_and_recs (emotion_record_id, tip) VALUES ($1, $2)")
                .bind(record.id)
                .bind(tip)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;

        Ok(record)
    }

    async fn user_may_read_image(&self, user_id: i64, image_key: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                 SELECT 1 FROM pets WHERE user_id = $1 AND image_key = $2 \
                 UNION \
                 SELECT 1 FROM emotion_records er \
                 JOIN pets p ON p.id = er.pet_id \
                 WHERE p.user_id = $1 AND er.image_key = $2 \
             )",
        )
        .bind(user_id)
        .bind(image_key)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }
}
