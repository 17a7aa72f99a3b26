//! Indexer health report, cached for a few minutes.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::indexer::IndexerRegistry;

const STATUS_KEY: &str = "status";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexerHealth {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub checked_at: DateTime<Utc>,
    pub healthy: usize,
    pub total: usize,
    pub indexers: Vec<IndexerHealth>,
}

pub type StatusCache = TtlCache<&'static str, Arc<StatusReport>>;

pub struct StatusService {
    registry: Arc<dyn IndexerRegistry>,
    cache: Arc<StatusCache>,
}

impl StatusService {
    pub fn new(registry: Arc<dyn IndexerRegistry>, cache: Arc<StatusCache>) -> Self {
        Self { registry, cache }
    }

    /// Current report, checking every indexer if the cached one expired.
    pub async fn status(&self) -> Arc<StatusReport> {
        if let Some(report) = self.cache.get(&STATUS_KEY) {
            return report;
        }

        let indexers = self.registry.all();
        let checks = indexers.iter().map(|indexer| async move {
            let start = Instant::now();
            let result = indexer.check().await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(()) => IndexerHealth {
                    name: indexer.name().to_string(),
                    ok: true,
                    error: None,
                    latency_ms,
                },
                Err(e) => {
                    warn!(indexer = %indexer.name(), error = %e, "Indexer check failed");
                    IndexerHealth {
                        name: indexer.name().to_string(),
                        ok: false,
                        error: Some(e.to_string()),
                        latency_ms,
                    }
                }
            }
        });
        let health = join_all(checks).await;

        let report = Arc::new(StatusReport {
            checked_at: Utc::now(),
            healthy: health.iter().filter(|h| h.ok).count(),
            total: health.len(),
            indexers: health,
        });
        debug!(healthy = report.healthy, total = report.total, "Indexer status refreshed");

        self.cache.add(STATUS_KEY, report.clone());
        report
    }
}
