//! Client-side request coalescing.
//!
//! Rendering sites ask for one string at a time. The coalescer collects the
//! requests that arrive within one short window, deduplicates them by exact
//! text and sends a single `translate_many` per locale. A key that is
//! already queued or in flight is joined rather than requested again.

use crate::cache::{TranslationCache, TranslationKey};
use crate::i18n::Locale;
use crate::resolver::BatchTranslate;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, warn};

/// Default collection window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(10);

#[derive(Default)]
struct CoalescerState {
    /// Distinct texts waiting for the next dispatch, per locale
    queued: HashMap<Locale, Vec<String>>,
    /// Everyone waiting on a key, whether queued or in flight
    waiters: HashMap<TranslationKey, Vec<oneshot::Sender<String>>>,
    flush_scheduled: bool,
    /// Bumped on every flush so a timer armed for an earlier window does
    /// not cut the current one short
    window_id: u64,
}

/// Micro-batching front end for a `BatchTranslate` backend.
pub struct RequestCoalescer {
    backend: Arc<dyn BatchTranslate>,
    cache: Arc<TranslationCache>,
    window: Duration,
    state: Mutex<CoalescerState>,
    shutdown: AtomicBool,
}

impl RequestCoalescer {
    /// `cache` is the session cache consulted before anything is queued.
    pub fn new(
        backend: Arc<dyn BatchTranslate>,
        cache: Arc<TranslationCache>,
        window: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            cache,
            window,
            state: Mutex::new(CoalescerState::default()),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Translate `text` into `locale`.
    ///
    /// Never fails: the source text is returned if the batch errors, if the
    /// coalescer has shut down, or if the backend left the text out.
    pub async fn request(self: &Arc<Self>, text: &str, locale: Locale) -> String {
        if locale.is_default() || text.is_empty() {
            return text.to_string();
        }

        let key = TranslationKey::new(text, locale);
        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }

        match self.enqueue(key).await {
            Some(receiver) => receiver.await.unwrap_or_else(|_| text.to_string()),
            None => text.to_string(),
        }
    }

    /// Dispatch everything queued right now instead of waiting for the window.
    pub async fn flush(&self) {
        self.flush_window(None).await;
    }

    /// Flush the current window, or only `window_id` if given.
    async fn flush_window(&self, window_id: Option<u64>) {
        let batches = {
            let mut state = self.state.lock().await;
            if window_id.is_some_and(|id| id != state.window_id) {
                return;
            }
            state.window_id += 1;
            state.flush_scheduled = false;
            std::mem::take(&mut state.queued)
        };

        if batches.is_empty() {
            return;
        }

        join_all(
            batches
                .into_iter()
                .map(|(locale, texts)| self.dispatch(locale, texts)),
        )
        .await;
    }

    /// Flush pending work and stop accepting new batches.
    ///
    /// Requests made afterwards resolve to their source text.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.flush().await;
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Number of keys queued or in flight.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.waiters.len()
    }

    async fn enqueue(self: &Arc<Self>, key: TranslationKey) -> Option<oneshot::Receiver<String>> {
        if self.is_shutdown() {
            return None;
        }

        let (sender, receiver) = oneshot::channel();
        let mut state = self.state.lock().await;

        if let Some(waiting) = state.waiters.get_mut(&key) {
            waiting.push(sender);
            return Some(receiver);
        }

        state
            .queued
            .entry(key.locale())
            .or_default()
            .push(key.text().to_string());
        state.waiters.insert(key, vec![sender]);

        if !state.flush_scheduled {
            state.flush_scheduled = true;
            let window_id = state.window_id;
            let this = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(this.window).await;
                this.flush_window(Some(window_id)).await;
            });
        }

        Some(receiver)
    }

    async fn dispatch(&self, locale: Locale, texts: Vec<String>) {
        debug!(locale = %locale, count = texts.len(), "Dispatching coalesced batch");

        let translations = match self.backend.translate_many(&texts, locale.code()).await {
            Ok(map) => Some(map),
            Err(e) if e.is_caller_error() => {
                error!(locale = %locale, error = %e, "Coalesced batch rejected, using source text");
                None
            }
            Err(e) => {
                warn!(locale = %locale, error = %e, "Coalesced batch failed, using source text");
                None
            }
        };

        for text in texts {
            let value = translations
                .as_ref()
                .and_then(|map| map.get(&text))
                .unwrap_or(&text)
                .to_string();
            let key = TranslationKey::new(text.as_str(), locale);

            // Source-text fallbacks are not cached so a later render retries
            if value != text {
                self.cache.put(key.clone(), value.clone()).await;
            }

            let waiting = self.state.lock().await.waiters.remove(&key);
            for sender in waiting.into_iter().flatten() {
                // Receiver gone means the caller stopped caring
                let _ = sender.send(value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;
    use crate::resolver::{TranslationMap, Translator};
    use crate::test_support::StubProvider;
    use async_trait::async_trait;

    fn locale(code: &str) -> Locale {
        Locale::from_code(code).unwrap()
    }

    fn setup(provider: StubProvider) -> (Arc<RequestCoalescer>, Arc<StubProvider>, Arc<Translator>) {
        let provider = Arc::new(provider);
        let translator = Arc::new(Translator::new(
            Arc::new(TranslationCache::in_memory()),
            provider.clone(),
        ));
        let coalescer = RequestCoalescer::new(
            translator.clone(),
            Arc::new(TranslationCache::in_memory()),
            Duration::from_millis(20),
        );
        (coalescer, provider, translator)
    }

    struct FailingBackend;

    #[async_trait]
    impl BatchTranslate for FailingBackend {
        async fn translate_many(
            &self,
            _texts: &[String],
            _target: &str,
        ) -> Result<TranslationMap, TranslateError> {
            Err(TranslateError::ProviderUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_requests_in_one_window_share_one_batch() {
        let (coalescer, provider, _) = setup(StubProvider::new());
        let en = locale("en");

        let (a, b, c) = tokio::join!(
            coalescer.request("Simuler", en),
            coalescer.request("Économies", en),
            coalescer.request("Contact", en),
        );

        assert_eq!(a, "[en] Simuler");
        assert_eq!(b, "[en] Économies");
        assert_eq!(c, "[en] Contact");
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.batches()[0].1.len(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_requests_are_sent_once() {
        let (coalescer, provider, _) = setup(StubProvider::new());
        let he = locale("he");

        let results = join_all((0..5).map(|_| coalescer.request("Bonjour", he))).await;

        assert!(results.iter().all(|r| r == "[he] Bonjour"));
        assert_eq!(provider.batches()[0].1, vec!["Bonjour".to_string()]);
    }

    #[tokio::test]
    async fn test_one_batch_per_locale() {
        let (coalescer, provider, _) = setup(StubProvider::new());

        let (en, he) = tokio::join!(
            coalescer.request("Bonjour", locale("en")),
            coalescer.request("Bonjour", locale("he")),
        );

        assert_eq!(en, "[en] Bonjour");
        assert_eq!(he, "[he] Bonjour");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_default_locale_skips_backend() {
        let (coalescer, provider, _) = setup(StubProvider::new());

        assert_eq!(coalescer.request("Bonjour", locale("fr")).await, "Bonjour");
        assert_eq!(coalescer.request("", locale("en")).await, "");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_session_cache_hit_skips_backend() {
        let (coalescer, provider, _) = setup(StubProvider::new());
        let ru = locale("ru");

        coalescer.request("Bonjour", ru).await;
        let again = coalescer.request("Bonjour", ru).await;

        assert_eq!(again, "[ru] Bonjour");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_late_request_joins_in_flight_key() {
        let (coalescer, provider, _) =
            setup(StubProvider::with_delay(Duration::from_millis(150)));
        let es = locale("es");

        let first = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move { coalescer.request("Bonjour", es).await })
        };

        // Past the window: the first batch is now in flight
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(provider.calls(), 1);

        let (same, other) = tokio::join!(
            coalescer.request("Bonjour", es),
            coalescer.request("Merci", es),
        );

        assert_eq!(first.await.unwrap(), "[es] Bonjour");
        assert_eq!(same, "[es] Bonjour");
        assert_eq!(other, "[es] Merci");

        let batches = provider.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].1, vec!["Merci".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_caller_still_fills_cache() {
        let (coalescer, provider, translator) =
            setup(StubProvider::with_delay(Duration::from_millis(50)));
        let ar = locale("ar");

        let handle = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move { coalescer.request("Bonjour", ar).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.abort();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(provider.calls(), 1);
        assert_eq!(
            translator
                .cache()
                .get(&TranslationKey::new("Bonjour", ar))
                .await,
            Some("[ar] Bonjour".to_string())
        );
        assert_eq!(coalescer.pending().await, 0);
    }

    #[tokio::test]
    async fn test_backend_error_resolves_to_source_text() {
        let coalescer = RequestCoalescer::new(
            Arc::new(FailingBackend),
            Arc::new(TranslationCache::in_memory()),
            Duration::from_millis(5),
        );

        let result = coalescer.request("Bonjour", locale("en")).await;
        assert_eq!(result, "Bonjour");
        assert_eq!(coalescer.pending().await, 0);
    }

    struct RejectingBackend;

    #[async_trait]
    impl BatchTranslate for RejectingBackend {
        async fn translate_many(
            &self,
            _texts: &[String],
            target: &str,
        ) -> Result<TranslationMap, TranslateError> {
            Err(TranslateError::invalid_locale(target))
        }
    }

    #[tokio::test]
    async fn test_rejected_batch_resolves_to_source_text() {
        let coalescer = RequestCoalescer::new(
            Arc::new(RejectingBackend),
            Arc::new(TranslationCache::in_memory()),
            Duration::from_millis(5),
        );

        assert_eq!(coalescer.request("Bonjour", locale("he")).await, "Bonjour");
        assert_eq!(coalescer.pending().await, 0);
    }

    #[tokio::test]
    async fn test_fallbacks_are_not_cached_in_session() {
        let (coalescer, provider, _) = setup(StubProvider::failing());
        let en = locale("en");

        assert_eq!(coalescer.request("Bonjour", en).await, "Bonjour");
        provider.set_failing(false);
        assert_eq!(coalescer.request("Bonjour", en).await, "[en] Bonjour");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_flush_dispatches_immediately() {
        let provider = Arc::new(StubProvider::new());
        let translator = Arc::new(Translator::new(
            Arc::new(TranslationCache::in_memory()),
            provider.clone(),
        ));
        let coalescer = RequestCoalescer::new(
            translator,
            Arc::new(TranslationCache::in_memory()),
            Duration::from_secs(60),
        );

        let pending = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move { coalescer.request("Bonjour", locale("en")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        coalescer.flush().await;

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("flush should resolve the request")
            .unwrap();
        assert_eq!(result, "[en] Bonjour");
    }

    #[tokio::test]
    async fn test_manual_flush_does_not_shorten_next_window() {
        let provider = Arc::new(StubProvider::new());
        let translator = Arc::new(Translator::new(
            Arc::new(TranslationCache::in_memory()),
            provider.clone(),
        ));
        let coalescer = RequestCoalescer::new(
            translator,
            Arc::new(TranslationCache::in_memory()),
            Duration::from_millis(200),
        );
        let en = locale("en");

        // First window: flushed by hand, its timer stays armed
        let first = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move { coalescer.request("Bonjour", en).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        coalescer.flush().await;
        assert_eq!(first.await.unwrap(), "[en] Bonjour");

        // Second window opens 120 ms before the stale timer would fire
        tokio::time::sleep(Duration::from_millis(60)).await;
        let second = {
            let coalescer = Arc::clone(&coalescer);
            tokio::spawn(async move { coalescer.request("Merci", en).await })
        };

        // Stale timer has fired by now; the new window must still be open
        tokio::time::sleep(Duration::from_millis(160)).await;
        assert_eq!(provider.calls(), 1);
        assert_eq!(coalescer.pending().await, 1);

        assert_eq!(second.await.unwrap(), "[en] Merci");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let (coalescer, provider, _) = setup(StubProvider::new());

        coalescer.shutdown().await;
        assert!(coalescer.is_shutdown());
        assert_eq!(coalescer.request("Bonjour", locale("en")).await, "Bonjour");
        assert_eq!(provider.calls(), 0);
    }
}
