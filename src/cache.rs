//! Translation cache: append-only map from (source text, locale) to translation.
//!
//! Entries live in memory for the lifetime of the process. When a
//! `TranslationStore` is attached, the cache is its only reader and writer:
//! misses in memory fall through to the store and writes go to both.

use crate::i18n::Locale;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Identity of a cacheable unit of work.
///
/// Text equality is exact: no trimming, case folding or Unicode
/// normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationKey {
    text: String,
    locale: Locale,
}

impl TranslationKey {
    pub fn new(text: impl Into<String>, locale: Locale) -> Self {
        Self {
            text: text.into(),
            locale,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}

/// Durable backing storage for cache entries.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn load(&self, key: &TranslationKey) -> anyhow::Result<Option<String>>;

    async fn save(&self, key: &TranslationKey, value: &str) -> anyhow::Result<()>;

    /// Release connections held by the store.
    async fn close(&self) {}
}

/// Process-wide translation cache.
///
/// Safe for concurrent use; a concurrent write to the same key is
/// last-writer-wins.
pub struct TranslationCache {
    entries: RwLock<HashMap<TranslationKey, String>>,
    store: Option<Arc<dyn TranslationStore>>,
}

impl TranslationCache {
    /// Cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store: None,
        }
    }

    /// Cache backed by durable storage.
    pub fn with_store(store: Arc<dyn TranslationStore>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store: Some(store),
        }
    }

    /// Look up a translation.
    ///
    /// Store errors are logged and reported as a miss.
    pub async fn get(&self, key: &TranslationKey) -> Option<String> {
        if let Some(value) = self.entries.read().await.get(key) {
            return Some(value.clone());
        }

        let store = self.store.as_ref()?;
        match store.load(key).await {
            Ok(Some(value)) => {
                debug!(locale = %key.locale(), "Loaded translation from backing store");
                self.entries
                    .write()
                    .await
                    .insert(key.clone(), value.clone());
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(locale = %key.locale(), error = %e, "Translation store lookup failed");
                None
            }
        }
    }

    /// Record a translation.
    ///
    /// Writing the same value twice is a no-op.
    pub async fn put(&self, key: TranslationKey, value: String) {
        {
            let mut entries = self.entries.write().await;
            if entries.get(&key) == Some(&value) {
                return;
            }
            entries.insert(key.clone(), value.clone());
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&key, &value).await {
                warn!(locale = %key.locale(), error = %e, "Failed to persist translation");
            }
        }
    }

    /// Number of entries held in memory.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Tear down the backing store, if any.
    pub async fn close(&self) {
        if let Some(store) = &self.store {
            store.close().await;
        }
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::in_memory()
    }
}
