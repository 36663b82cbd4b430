//! Translation resolver: cache first, provider for misses.
//!
//! Translation is best-effort. Only caller mistakes (unknown locale, no
//! input) are reported as errors; any provider trouble degrades to the
//! source text and leaves the cache untouched so a later call retries.

use crate::cache::{TranslationCache, TranslationKey};
use crate::error::TranslateError;
use crate::i18n::{Locale, TranslationMetrics, TranslationValidator};
use crate::provider::TranslationProvider;
use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default upper bound on one provider call
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Mapping from distinct source text to translated text.
///
/// Keeps the first-occurrence order of the input and serializes as a JSON
/// object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationMap {
    entries: Vec<(String, String)>,
    /// Position of each source text in `entries`
    index: HashMap<String, usize>,
}

impl TranslationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translation for `text`, if the map covers it.
    pub fn get(&self, text: &str) -> Option<&str> {
        self.index
            .get(text)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(source, translated)| (source.as_str(), translated.as_str()))
    }

    /// Insert unless `source` is already present.
    fn insert(&mut self, source: String, translated: String) {
        if self.index.contains_key(&source) {
            return;
        }
        self.index.insert(source.clone(), self.entries.len());
        self.entries.push((source, translated));
    }
}

impl FromIterator<(String, String)> for TranslationMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = TranslationMap {
            entries: Vec::with_capacity(iter.size_hint().0),
            index: HashMap::with_capacity(iter.size_hint().0),
        };
        for (source, translated) in iter {
            map.insert(source, translated);
        }
        map
    }
}

impl Serialize for TranslationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (source, translated) in &self.entries {
            map.serialize_entry(source, translated)?;
        }
        map.end()
    }
}

/// Batch translation seam shared by the in-process resolver and the HTTP
/// client, so the coalescer can sit in front of either.
#[async_trait]
pub trait BatchTranslate: Send + Sync {
    async fn translate_many(
        &self,
        texts: &[String],
        target: &str,
    ) -> Result<TranslationMap, TranslateError>;
}

/// Remove duplicates by exact equality, keeping first-occurrence order.
pub fn distinct_texts(texts: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(texts.len());
    texts
        .iter()
        .filter(|text| seen.insert(text.as_str()))
        .cloned()
        .collect()
}

/// Server-side translation context.
///
/// One instance per process, shared through `Arc`. Owns the cache, the
/// provider handle and the metrics.
pub struct Translator {
    cache: Arc<TranslationCache>,
    provider: Arc<dyn TranslationProvider>,
    metrics: TranslationMetrics,
    provider_timeout: Duration,
}

impl Translator {
    pub fn new(cache: Arc<TranslationCache>, provider: Arc<dyn TranslationProvider>) -> Self {
        Self {
            cache,
            provider,
            metrics: TranslationMetrics::new(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.metrics
    }

    /// Translate a single string.
    ///
    /// Returns `text` unchanged for the default locale, for empty text and
    /// whenever the provider fails.
    pub async fn translate_one(&self, text: &str, target: Locale) -> String {
        if target.is_default() || text.is_empty() {
            return text.to_string();
        }

        let map = self.resolve(vec![text.to_string()], target).await;
        map.get(text).unwrap_or(text).to_string()
    }

    /// Translate a batch of strings into the locale named by `target`.
    ///
    /// The result has one entry per distinct input text. At most one
    /// provider call is made, covering only the cache misses.
    ///
    /// # Errors
    /// `InvalidLocale` if `target` is not an enabled locale (checked before
    /// anything else), `EmptyInput` if `texts` is empty.
    pub async fn translate_many(
        &self,
        texts: &[String],
        target: &str,
    ) -> Result<TranslationMap, TranslateError> {
        let locale = Locale::from_code(target)?;
        if texts.is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let distinct = distinct_texts(texts);
        if locale.is_default() {
            return Ok(distinct.into_iter().map(|t| (t.clone(), t)).collect());
        }

        Ok(self.resolve(distinct, locale).await)
    }

    /// Release the cache's backing store.
    pub async fn shutdown(&self) {
        info!("Shutting down translator");
        self.cache.close().await;
    }

    /// Resolve already-deduplicated texts for a non-default locale.
    async fn resolve(&self, distinct: Vec<String>, target: Locale) -> TranslationMap {
        let mut resolved: HashMap<String, String> = HashMap::with_capacity(distinct.len());
        let mut misses: Vec<String> = Vec::new();

        for text in &distinct {
            if text.is_empty() {
                resolved.insert(text.clone(), text.clone());
                continue;
            }
            match self.cache.get(&TranslationKey::new(text.as_str(), target)).await {
                Some(hit) => {
                    self.metrics.record_cache_hit();
                    resolved.insert(text.clone(), hit);
                }
                None => {
                    self.metrics.record_cache_miss();
                    misses.push(text.clone());
                }
            }
        }

        if !misses.is_empty() {
            debug!(
                locale = %target,
                hits = resolved.len(),
                misses = misses.len(),
                "Resolving translation batch"
            );

            match self.call_provider(&misses, target).await {
                Ok(mut translated) => {
                    for text in misses {
                        let value = translated.remove(&text).unwrap_or_else(|| text.clone());
                        self.cache
                            .put(TranslationKey::new(text.as_str(), target), value.clone())
                            .await;
                        resolved.insert(text, value);
                    }
                }
                Err(e) => {
                    warn!(
                        locale = %target,
                        count = misses.len(),
                        error = %e,
                        "Falling back to source text"
                    );
                    for text in misses {
                        resolved.insert(text.clone(), text);
                    }
                }
            }
        }

        distinct
            .into_iter()
            .map(|text| {
                let value = resolved.remove(&text).unwrap_or_else(|| text.clone());
                (text, value)
            })
            .collect()
    }

    /// One bounded provider call for all misses. The batch succeeds or
    /// fails as a whole.
    async fn call_provider(
        &self,
        misses: &[String],
        target: Locale,
    ) -> Result<HashMap<String, String>, TranslateError> {
        self.metrics.record_provider_call(misses.len());

        let result =
            match tokio::time::timeout(self.provider_timeout, self.provider.translate_batch(misses, target))
                .await
            {
                Ok(Ok(translated)) => check_batch(misses, translated, target),
                Ok(Err(e)) => Err(TranslateError::ProviderUnavailable(format!("{:#}", e))),
                Err(_) => Err(TranslateError::ProviderUnavailable(format!(
                    "timed out after {:?}",
                    self.provider_timeout
                ))),
            };

        if result.is_err() {
            self.metrics.record_provider_failure();
        }
        result
    }
}

/// Verify the provider answered every miss with a usable string.
fn check_batch(
    misses: &[String],
    translated: HashMap<String, String>,
    target: Locale,
) -> Result<HashMap<String, String>, TranslateError> {
    for text in misses {
        let Some(value) = translated.get(text) else {
            return Err(TranslateError::ProviderUnavailable(format!(
                "provider returned no translation for {:?}",
                text
            )));
        };

        let report = TranslationValidator::validate(text, value);
        if report.has_errors() {
            return Err(TranslateError::ProviderUnavailable(format!(
                "unusable translation for {:?}: {:?}",
                text, report.errors
            )));
        }
        if report.has_warnings() {
            warn!(
                "Translation validation warnings for {} ({}): {:?}",
                target.name(),
                target.code(),
                report.warnings
            );
        }
    }
    Ok(translated)
}

#[async_trait]
impl BatchTranslate for Translator {
    async fn translate_many(
        &self,
        texts: &[String],
        target: &str,
    ) -> Result<TranslationMap, TranslateError> {
        Translator::translate_many(self, texts, target).await
    }
}
