//! Shared fakes for unit tests.

use crate::i18n::Locale;
use crate::provider::TranslationProvider;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Provider that "translates" by tagging text with the locale code,
/// e.g. `Bonjour` -> `[en] Bonjour`, and records every batch it receives.
#[derive(Default)]
pub(crate) struct StubProvider {
    calls: AtomicUsize,
    batches: Mutex<Vec<(Locale, Vec<String>)>>,
    failing: AtomicBool,
    delay: Option<Duration>,
    /// Translate to this exact string instead of tagging
    fixed: HashMap<String, String>,
}

impl StubProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        let provider = Self::default();
        provider.set_failing(true);
        provider
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn with_fixed(pairs: &[(&str, &str)]) -> Self {
        Self {
            fixed: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn batches(&self) -> Vec<(Locale, Vec<String>)> {
        self.batches.lock().unwrap().clone()
    }

    pub(crate) fn tag(text: &str, target: Locale) -> String {
        format!("[{}] {}", target.code(), text)
    }
}

#[async_trait]
impl TranslationProvider for StubProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        target: Locale,
    ) -> anyhow::Result<HashMap<String, String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .unwrap()
            .push((target, texts.to_vec()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("provider offline");
        }

        // Reverse so callers cannot rely on result order
        Ok(texts
            .iter()
            .rev()
            .map(|text| {
                let translated = self
                    .fixed
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| Self::tag(text, target));
                (text.clone(), translated)
            })
            .collect())
    }
}
