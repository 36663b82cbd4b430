//! Translation metrics and observability module.
//!
//! Counters for cache hits, cache misses and provider traffic. One instance
//! is owned by each `Translator` and shared by reference.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Translation counters.
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Lookups answered by the cache (memory or backing store)
    cache_hits: AtomicUsize,

    /// Lookups that had to go to the provider
    cache_misses: AtomicUsize,

    /// Batch calls made to the provider
    provider_calls: AtomicUsize,

    /// Provider calls that failed or timed out
    provider_failures: AtomicUsize,

    /// Individual texts sent to the provider across all calls
    provider_texts: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one provider call carrying `texts` source strings.
    pub fn record_provider_call(&self, texts: usize) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
        self.provider_texts.fetch_add(texts, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    pub fn provider_failures(&self) -> usize {
        self.provider_failures.load(Ordering::Relaxed)
    }

    pub fn provider_texts(&self) -> usize {
        self.provider_texts.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let total_lookups = hits + misses;
        let cache_hit_rate = if total_lookups > 0 {
            (hits as f64 / total_lookups as f64) * 100.0
        } else {
            0.0
        };

        let calls = self.provider_calls();
        let failures = self.provider_failures();
        let provider_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            provider_calls: calls,
            provider_failures: failures,
            provider_texts: self.provider_texts(),
            provider_success_rate,
        }
    }
}

/// Snapshot of the translation counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub provider_calls: usize,
    pub provider_failures: usize,
    pub provider_texts: usize,

    /// Provider success rate as a percentage (0-100)
    pub provider_success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cache_hit() {
        let metrics = TranslationMetrics::new();
        assert_eq!(metrics.cache_hits(), 0);
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        assert_eq!(metrics.cache_hits(), 2);
    }

    #[test]
    fn test_record_provider_call_counts_texts() {
        let metrics = TranslationMetrics::new();
        metrics.record_provider_call(3);
        metrics.record_provider_call(2);
        assert_eq!(metrics.provider_calls(), 2);
        assert_eq!(metrics.provider_texts(), 5);
    }

    #[test]
    fn test_report_empty() {
        let report = TranslationMetrics::new().report();
        assert_eq!(report.cache_hits, 0);
        assert_eq!(report.cache_misses, 0);
        assert_eq!(report.cache_hit_rate, 0.0);
        assert_eq!(report.provider_calls, 0);
        assert_eq!(report.provider_success_rate, 0.0);
    }

    #[test]
    fn test_report_cache_hit_rate() {
        let metrics = TranslationMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        let report = metrics.report();
        assert_eq!(report.cache_hits, 3);
        assert_eq!(report.cache_misses, 1);
        assert_eq!(report.cache_hit_rate, 75.0);
    }

    #[test]
    fn test_report_provider_success_rate() {
        let metrics = TranslationMetrics::new();

        // 4 calls, 1 failure = 75% success rate
        for _ in 0..4 {
            metrics.record_provider_call(1);
        }
        metrics.record_provider_failure();

        let report = metrics.report();
        assert_eq!(report.provider_calls, 4);
        assert_eq!(report.provider_failures, 1);
        assert_eq!(report.provider_success_rate, 75.0);
    }

    #[test]
    fn test_report_all_provider_failures() {
        let metrics = TranslationMetrics::new();
        metrics.record_provider_call(1);
        metrics.record_provider_failure();
        metrics.record_provider_call(1);
        metrics.record_provider_failure();

        assert_eq!(metrics.report().provider_success_rate, 0.0);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = TranslationMetrics::new();
        let b = TranslationMetrics::new();
        a.record_cache_hit();
        assert_eq!(a.cache_hits(), 1);
        assert_eq!(b.cache_hits(), 0);
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_value(TranslationMetrics::new().report()).unwrap();
        assert!(json.get("cache_hit_rate").is_some());
        assert!(json.get("provider_texts").is_some());
    }
}
