//! Multi-indexer search.
//!
//! Each indexer runs in its own task and forwards pages into one bounded
//! channel. Items are kept in arrival order. A failing indexer is logged
//! and skipped; only when every indexer fails is the search an error.

use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{ItemState, LinkRewriter, ResultItem, ScrapeItem, SearchQuery, SeenStore, TrackedItem};
use crate::indexer::{Indexer, IndexerError, ResultPage};
use crate::metrics::{AGGREGATION_DURATION, INDEXER_ERRORS, ITEM_CLASSIFICATIONS, SEARCH_RESULTS};
use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("No indexers to search")]
    NoSources,

    #[error("All indexers failed")]
    AllSourcesFailed(HashMap<String, String>),

    #[error("Failed to build download link: {0}")]
    Encoding(#[from] TokenError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub pages: usize,
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub sources_failed: usize,
}

#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub items: Vec<ResultItem>,
    /// Indexer name -> error message, for indexers that failed.
    pub source_errors: HashMap<String, String>,
    pub stats: AggregateStats,
    pub duration_ms: u64,
}

enum SourceEvent {
    Page { indexer: String, page: ResultPage },
    Failed { indexer: String, error: IndexerError },
    Done { indexer: String, pages: u32 },
}

pub struct SearchAggregator {
    seen: Arc<dyn SeenStore>,
    rewriter: LinkRewriter,
    default_max_pages: u32,
    channel_capacity: usize,
}

impl SearchAggregator {
    pub fn new(seen: Arc<dyn SeenStore>, rewriter: LinkRewriter) -> Self {
        Self {
            seen,
            rewriter,
            default_max_pages: 3,
            channel_capacity: 16,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.default_max_pages = max_pages.max(1);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub async fn search(
        &self,
        indexers: &[Arc<dyn Indexer>],
        query: &SearchQuery,
    ) -> Result<AggregateResult, AggregateError> {
        if indexers.is_empty() {
            return Err(AggregateError::NoSources);
        }

        let start = Instant::now();
        let max_pages = query.max_pages.unwrap_or(self.default_max_pages).max(1);
        let limit = query.effective_limit();
        let wanted = query.offset as usize + limit;

        debug!(
            indexers = indexers.len(),
            query = %query.text,
            query_type = %query.query_type,
            max_pages,
            limit,
            "Starting aggregated search"
        );

        let (tx, mut rx) = mpsc::channel(self.channel_capacity);
        let mut producers = JoinSet::new();
        for indexer in indexers {
            producers.spawn(produce(indexer.clone(), query.clone(), max_pages, tx.clone()));
        }
        drop(tx);

        let mut collected: Vec<ScrapeItem> = Vec::new();
        let mut source_errors: HashMap<String, String> = HashMap::new();
        let mut per_source: HashMap<String, usize> = HashMap::new();
        let mut stats = AggregateStats::default();

        while let Some(event) = rx.recv().await {
            match event {
                SourceEvent::Page { indexer, page } => {
                    stats.pages += 1;
                    let accepted = page.items.into_iter().filter(|item| query.accepts(item));
                    let before = collected.len();
                    collected.extend(accepted);
                    *per_source.entry(indexer).or_default() += collected.len() - before;

                    if collected.len() >= wanted {
                        debug!(collected = collected.len(), "Limit reached, stopping indexers");
                        break;
                    }
                }
                SourceEvent::Failed { indexer, error } => {
                    warn!(indexer = %indexer, error = %error, "Indexer search failed");
                    INDEXER_ERRORS
                        .with_label_values(&[indexer.as_str(), error.kind()])
                        .inc();
                    source_errors.insert(indexer, error.to_string());
                }
                SourceEvent::Done { indexer, pages } => {
                    debug!(indexer = %indexer, pages, "Indexer finished");
                }
            }
        }
        producers.abort_all();

        for (indexer, count) in &per_source {
            SEARCH_RESULTS
                .with_label_values(&[indexer.as_str()])
                .observe(*count as f64);
        }

        stats.sources_failed = source_errors.len();
        if source_errors.len() == indexers.len() && collected.is_empty() {
            AGGREGATION_DURATION
                .with_label_values(&["failed"])
                .observe(start.elapsed().as_secs_f64());
            return Err(AggregateError::AllSourcesFailed(source_errors));
        }

        let mut items = Vec::with_capacity(limit.min(collected.len()));
        for mut item in collected.into_iter().skip(query.offset as usize).take(limit) {
            let fingerprint = item.fingerprint();
            let (uuid, state) = self.seen.classify(&item);
            match state {
                ItemState::New => stats.new += 1,
                ItemState::Updated => stats.updated += 1,
                ItemState::Unchanged => stats.unchanged += 1,
            }
            ITEM_CLASSIFICATIONS.with_label_values(&[state.as_str()]).inc();

            self.rewriter.rewrite(&mut item)?;
            items.push(ResultItem::Tracked(TrackedItem {
                item,
                uuid,
                fingerprint,
                state,
            }));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let result_label = if source_errors.is_empty() {
            "success"
        } else {
            "partial"
        };
        AGGREGATION_DURATION
            .with_label_values(&[result_label])
            .observe(start.elapsed().as_secs_f64());

        info!(
            results = items.len(),
            new = stats.new,
            updated = stats.updated,
            unchanged = stats.unchanged,
            failed_indexers = stats.sources_failed,
            duration_ms,
            "Aggregated search complete"
        );

        Ok(AggregateResult {
            items,
            source_errors,
            stats,
            duration_ms,
        })
    }
}

/// Pull up to `max_pages` pages from one indexer into the channel.
/// Returns early once the receiver is gone.
async fn produce(
    indexer: Arc<dyn Indexer>,
    query: SearchQuery,
    max_pages: u32,
    tx: mpsc::Sender<SourceEvent>,
) {
    let name = indexer.name().to_string();

    let mut pages = match indexer.search(&query).await {
        Ok(pages) => pages,
        Err(error) => {
            let _ = tx.send(SourceEvent::Failed { indexer: name, error }).await;
            return;
        }
    };

    let mut served = 0;
    while served < max_pages {
        match pages.next().await {
            Some(Ok(page)) => {
                served += 1;
                let event = SourceEvent::Page {
                    indexer: name.clone(),
                    page,
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            Some(Err(error)) => {
                let _ = tx.send(SourceEvent::Failed { indexer: name, error }).await;
                return;
            }
            None => break,
        }
    }

    let _ = tx
        .send(SourceEvent::Done {
            indexer: name,
            pages: served,
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SecretProvider;
    use crate::search::{MemorySeenStore, QueryType};
    use crate::testing::fixtures::{magnet_item, scrape_item};
    use crate::testing::MockIndexer;

    fn aggregator() -> SearchAggregator {
        let secrets = Arc::new(SecretProvider::new("", "serverpass"));
        SearchAggregator::new(
            Arc::new(MemorySeenStore::default()),
            LinkRewriter::new("http://nab.example", secrets),
        )
    }

    fn titles(result: &AggregateResult) -> Vec<String> {
        result
            .items
            .iter()
            .map(|i| i.as_scrape_item().title.clone())
            .collect()
    }

    fn page(site: &str, titles: &[&str]) -> Vec<ScrapeItem> {
        titles
            .iter()
            .map(|t| scrape_item(site, t, t))
            .collect()
    }

    #[tokio::test]
    async fn test_no_sources() {
        let result = aggregator()
            .search(&[], &SearchQuery::new(QueryType::Search, "x"))
            .await;
        assert!(matches!(result, Err(AggregateError::NoSources)));
    }

    #[tokio::test]
    async fn test_pages_are_concatenated_in_order() {
        let indexer: Arc<dyn Indexer> = Arc::new(
            MockIndexer::new("a")
                .with_page(page("a", &["a1", "a2"]))
                .with_page(page("a", &["a3"])),
        );

        let result = aggregator()
            .search(&[indexer], &SearchQuery::new(QueryType::Search, "x"))
            .await
            .unwrap();

        assert_eq!(titles(&result), vec!["a1", "a2", "a3"]);
        assert_eq!(result.stats.pages, 2);
        assert_eq!(result.stats.new, 3);
        assert!(result.source_errors.is_empty());
    }

    #[tokio::test]
    async fn test_max_pages_bounds_each_source() {
        let mock = Arc::new(
            MockIndexer::new("a")
                .with_page(page("a", &["a1"]))
                .with_page(page("a", &["a2"]))
                .with_page(page("a", &["a3"])),
        );
        let indexer: Arc<dyn Indexer> = mock.clone();

        let query = SearchQuery::new(QueryType::Search, "x").with_max_pages(2);
        let result = aggregator().search(&[indexer], &query).await.unwrap();

        assert_eq!(titles(&result), vec!["a1", "a2"]);
        assert_eq!(mock.pages_served(), 2);
    }

    #[tokio::test]
    async fn test_offset_and_limit() {
        let indexer: Arc<dyn Indexer> =
            Arc::new(MockIndexer::new("a").with_page(page("a", &["a1", "a2", "a3", "a4"])));

        let query = SearchQuery::new(QueryType::Search, "x")
            .with_offset(1)
            .with_limit(2);
        let result = aggregator().search(&[indexer], &query).await.unwrap();

        assert_eq!(titles(&result), vec!["a2", "a3"]);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_earlier_pages() {
        let indexer: Arc<dyn Indexer> = Arc::new(
            MockIndexer::new("a")
                .with_page(page("a", &["a1"]))
                .with_page_error(IndexerError::Timeout),
        );
        let other: Arc<dyn Indexer> =
            Arc::new(MockIndexer::new("b").with_page(page("b", &["b1"])));

        let result = aggregator()
            .search(&[indexer, other], &SearchQuery::new(QueryType::Search, "x"))
            .await
            .unwrap();

        let mut got = titles(&result);
        got.sort();
        assert_eq!(got, vec!["a1", "b1"]);
        assert_eq!(result.source_errors.len(), 1);
        assert!(result.source_errors.contains_key("a"));
    }

    #[tokio::test]
    async fn test_all_sources_failed() {
        let a: Arc<dyn Indexer> = Arc::new(MockIndexer::new("a").with_search_error(
            IndexerError::Login {
                indexer: "a".to_string(),
                message: "bad password".to_string(),
            },
        ));
        let b: Arc<dyn Indexer> = Arc::new(
            MockIndexer::new("b").with_search_error(IndexerError::Transport("refused".into())),
        );

        let result = aggregator()
            .search(&[a, b], &SearchQuery::new(QueryType::Search, "x"))
            .await;

        match result {
            Err(AggregateError::AllSourcesFailed(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors["a"].contains("bad password"));
            }
            other => panic!("expected AllSourcesFailed, got {:?}", other.map(|r| r.items)),
        }
    }

    #[tokio::test]
    async fn test_empty_results_are_not_failure() {
        let indexer: Arc<dyn Indexer> = Arc::new(MockIndexer::new("a"));
        let result = aggregator()
            .search(&[indexer], &SearchQuery::new(QueryType::Search, "x"))
            .await
            .unwrap();
        assert!(result.items.is_empty());
    }

    #[tokio::test]
    async fn test_links_rewritten_and_magnets_kept() {
        let indexer: Arc<dyn Indexer> = Arc::new(MockIndexer::new("a").with_page(vec![
            scrape_item("a", "1", "Web"),
            magnet_item("a", "2", "Magnet"),
        ]));

        let result = aggregator()
            .search(&[indexer], &SearchQuery::new(QueryType::Search, "x"))
            .await
            .unwrap();

        let web = result.items[0].as_scrape_item();
        assert!(web.link.starts_with("http://nab.example/d/"));
        let magnet = result.items[1].as_scrape_item();
        assert!(magnet.link.starts_with("magnet:"));
    }

    #[tokio::test]
    async fn test_classification_does_not_filter() {
        let aggregator = aggregator();
        let indexer: Arc<dyn Indexer> =
            Arc::new(MockIndexer::new("a").with_page(page("a", &["a1", "a2"])));
        let query = SearchQuery::new(QueryType::Search, "x");

        let first = aggregator.search(&[indexer.clone()], &query).await.unwrap();
        assert_eq!(first.stats.new, 2);

        let second = aggregator.search(&[indexer], &query).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.stats.unchanged, 2);
        assert_eq!(first.items[0].uuid(), second.items[0].uuid());
    }

    #[tokio::test]
    async fn test_size_filter_applies_before_limit() {
        let mut items = page("a", &["small", "big1", "big2"]);
        items[0].size = 10;
        items[1].size = 10_000;
        items[2].size = 10_000;
        let indexer: Arc<dyn Indexer> = Arc::new(MockIndexer::new("a").with_page(items));

        let mut query = SearchQuery::new(QueryType::Search, "x").with_limit(2);
        query.min_size = Some(1000);
        let result = aggregator().search(&[indexer], &query).await.unwrap();

        assert_eq!(titles(&result), vec!["big1", "big2"]);
    }
}
