use crate::cache::{TranslationKey, TranslationStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

/// PostgreSQL backing store for the translation cache.
///
/// Rows are keyed by an md5 of the source text so long paragraphs stay
/// within index limits; lookups still compare the full text.
#[derive(Clone)]
pub struct PgTranslationStore {
    pool: PgPool,
}

impl PgTranslationStore {
    /// Connect and create the translations table if needed
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let store = Self { pool };
        store.create_tables().await?;
        info!("✓ Translation store ready");
        Ok(store)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translations (
                source_hash TEXT NOT NULL,
                locale TEXT NOT NULL,
                source_text TEXT NOT NULL,
                translated_text TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (source_hash, locale)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create translations table")?;

        Ok(())
    }

    /// Number of stored translations
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM translations")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count translations")?;
        Ok(row.try_get("count")?)
    }
}

#[async_trait]
impl TranslationStore for PgTranslationStore {
    async fn load(&self, key: &TranslationKey) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT translated_text FROM translations
             WHERE source_hash = md5($1) AND locale = $2 AND source_text = $1",
        )
        .bind(key.text())
        .bind(key.locale().code())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load translation")?;

        match row {
            Some(row) => Ok(Some(row.try_get("translated_text")?)),
            None => Ok(None),
        }
    }

    async fn save(&self, key: &TranslationKey, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO translations (source_hash, locale, source_text, translated_text, created_at)
             VALUES (md5($1), $2, $1, $3, $4)
             ON CONFLICT (source_hash, locale)
             DO UPDATE SET translated_text = EXCLUDED.translated_text",
        )
        .bind(key.text())
        .bind(key.locale().code())
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to save translation")?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
