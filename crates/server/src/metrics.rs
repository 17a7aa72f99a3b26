//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the nabgate server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Download proxying outcomes
//! - Everything the core crate exports (caches, aggregation, tokens, auth)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "nabgate_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nabgate_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "nabgate_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Download Metrics
// =============================================================================

/// Proxied downloads by outcome.
pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("nabgate_downloads_total", "Download requests by outcome"),
        &["result"], // "ok", "rejected", "upstream_error"
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Downloads
    registry.register(Box::new(DOWNLOADS_TOTAL.clone())).unwrap();

    // Core metrics (caches, aggregation, tokens, auth)
    for metric in nabgate_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

static DOWNLOAD_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(d|download)/[^/]+(/[^/]*)?$").unwrap());
static CAPS_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/torznab/caps/[^/]+$").unwrap());
static TORZNAB_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/torznab/[^/]+(/api)?$").unwrap());

/// Routes without parameters, reported as-is.
const STATIC_PATHS: [&str; 4] = ["/health", "/config", "/status", "/metrics"];

/// Label for any path the router does not serve.
const UNMATCHED_PATH: &str = "other";

/// Normalize a path for metric labels.
///
/// Tokens, file names and index selectors come from clients, so they are
/// replaced with placeholders. Unknown paths all share one label.
pub fn normalize_path(path: &str) -> String {
    if STATIC_PATHS.contains(&path) {
        return path.to_string();
    }
    if let Some(caps) = DOWNLOAD_PATH.captures(path) {
        return format!("/{}/{{token}}/{{filename}}", &caps[1]);
    }
    if CAPS_PATH.is_match(path) {
        return "/torznab/caps/{indexes}".to_string();
    }
    if let Some(caps) = TORZNAB_PATH.captures(path) {
        let suffix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        return format!("/torznab/{{indexes}}{}", suffix);
    }
    UNMATCHED_PATH.to_string()
}
