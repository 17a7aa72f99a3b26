//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Response caches (lookups, evictions)
//! - Search aggregation (duration, per-indexer failures, item classification)
//! - Download tokens and API key checks

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Cache Metrics
// =============================================================================

/// Cache lookups by cache name and result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nabgate_cache_lookups_total", "Total cache lookups"),
        &["cache", "result"], // "hit", "miss"
    )
    .unwrap()
});

/// Entries evicted because a cache was full.
pub static CACHE_EVICTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nabgate_cache_evictions_total",
            "Entries evicted due to capacity pressure",
        ),
        &["cache"],
    )
    .unwrap()
});

// =============================================================================
// Aggregation Metrics
// =============================================================================

/// Aggregation duration in seconds.
pub static AGGREGATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "nabgate_aggregation_duration_seconds",
            "Duration of multi-indexer searches",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["result"], // "success", "partial", "failed"
    )
    .unwrap()
});

/// Items returned per indexer search.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "nabgate_search_results",
            "Number of items collected per indexer search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &["indexer"],
    )
    .unwrap()
});

/// Indexer failures by indexer and kind.
pub static INDEXER_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nabgate_indexer_errors_total", "Indexer failures"),
        &["indexer", "kind"], // "login", "transport", "timeout", "status", "parse", "unsupported"
    )
    .unwrap()
});

/// Items classified against the seen store.
pub static ITEM_CLASSIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nabgate_item_classifications_total",
            "Result items by classification",
        ),
        &["state"], // "new", "updated", "unchanged"
    )
    .unwrap()
});

// =============================================================================
// Token / Auth Metrics
// =============================================================================

/// Download tokens issued.
pub static TOKENS_ISSUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("nabgate_tokens_issued_total", "Download tokens issued").unwrap()
});

/// Download tokens rejected by reason.
pub static TOKENS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nabgate_tokens_rejected_total", "Download tokens rejected"),
        &["reason"], // "malformed", "invalid_signature"
    )
    .unwrap()
});

/// API key check failures.
pub static AUTH_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nabgate_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"], // "missing", "invalid"
    )
    .unwrap()
});

/// All core metrics, for registration by the server.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Cache
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(CACHE_EVICTIONS.clone()),
        // Aggregation
        Box::new(AGGREGATION_DURATION.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        Box::new(INDEXER_ERRORS.clone()),
        Box::new(ITEM_CLASSIFICATIONS.clone()),
        // Tokens / auth
        Box::new(TOKENS_ISSUED.clone()),
        Box::new(TOKENS_REJECTED.clone()),
        Box::new(AUTH_FAILURES.clone()),
    ]
}
