//! Request handling for the Torznab endpoint, independent of HTTP.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{caps_xml, encode_feed, EncodedFeed, TorznabError, TorznabRequest};
use crate::auth::ApiKeyAuthenticator;
use crate::cache::TtlCache;
use crate::indexer::{Capabilities, Indexer, IndexerRegistry};
use crate::search::{FeedMeta, ResultFeed, SearchAggregator};

/// What the HTTP layer should answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorznabOutcome {
    /// Relative location, answered with a redirect.
    Redirect(String),
    Caps(String),
    Feed(EncodedFeed),
    Error(TorznabError),
}

pub type FeedCache = TtlCache<String, Arc<ResultFeed>>;

pub struct TorznabResponder {
    registry: Arc<dyn IndexerRegistry>,
    auth: ApiKeyAuthenticator,
    aggregator: Arc<SearchAggregator>,
    cache: Arc<FeedCache>,
    public_url: String,
}

impl TorznabResponder {
    pub fn new(
        registry: Arc<dyn IndexerRegistry>,
        auth: ApiKeyAuthenticator,
        aggregator: Arc<SearchAggregator>,
        cache: Arc<FeedCache>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            auth,
            aggregator,
            cache,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn respond(&self, indexes: &str, request: &TorznabRequest) -> TorznabOutcome {
        match self.try_respond(indexes, request).await {
            Ok(outcome) => outcome,
            Err(error) => {
                debug!(indexes, code = error.code, description = %error.description, "Torznab error");
                TorznabOutcome::Error(error)
            }
        }
    }

    /// Capabilities of the indexers named by `indexes`, without auth.
    pub fn caps(&self, indexes: &str) -> TorznabOutcome {
        match self.caps_document(indexes) {
            Ok(xml) => TorznabOutcome::Caps(xml),
            Err(error) => TorznabOutcome::Error(error),
        }
    }

    async fn try_respond(
        &self,
        indexes: &str,
        request: &TorznabRequest,
    ) -> Result<TorznabOutcome, TorznabError> {
        if request.function().is_none() {
            return Ok(TorznabOutcome::Redirect(format!(
                "/torznab/caps/{}",
                urlencoding::encode(indexes)
            )));
        }
        if request.is_caps() {
            return self.caps_document(indexes).map(TorznabOutcome::Caps);
        }

        self.auth
            .authenticate(request.apikey.as_deref())
            .map_err(|_| TorznabError::insufficient_privileges())?;

        let indexers = self.resolve(indexes)?;
        let query = request.to_query()?;

        let caps = merged_caps(&indexers);
        if !caps.supports(query.query_type) {
            return Err(TorznabError::function_not_available(query.query_type));
        }
        let format = request.format()?;

        let names: Vec<&str> = indexers.iter().map(|i| i.name()).collect();
        let cache_key = format!("{}|{}", names.join(","), query.unique_key());

        let feed = match self.cache.get(&cache_key) {
            Some(feed) => {
                debug!(indexes, items = feed.len(), "Serving cached feed");
                feed
            }
            None => {
                let result = self
                    .aggregator
                    .search(&indexers, &query)
                    .await
                    .map_err(|e| {
                        warn!(indexes, error = %e, "Search failed");
                        TorznabError::unknown(e)
                    })?;

                let link = format!(
                    "{}/torznab/{}",
                    self.public_url,
                    urlencoding::encode(indexes)
                );
                let feed = Arc::new(ResultFeed::new(
                    FeedMeta {
                        id: link.clone(),
                        title: format!("nabgate: {}", names.join(", ")),
                        link,
                        language: "en-US".to_string(),
                        category: query.query_type.as_str().to_string(),
                        updated: Utc::now(),
                    },
                    result.items,
                ));
                self.cache.add(cache_key, feed.clone());

                info!(
                    indexes,
                    items = feed.len(),
                    failed = result.source_errors.len(),
                    "Search served"
                );
                feed
            }
        };

        encode_feed(&feed, format)
            .map(TorznabOutcome::Feed)
            .map_err(TorznabError::unknown)
    }

    fn resolve(&self, indexes: &str) -> Result<Vec<Arc<dyn Indexer>>, TorznabError> {
        self.registry
            .resolve(indexes)
            .map_err(TorznabError::incorrect_parameter)
    }

    fn caps_document(&self, indexes: &str) -> Result<String, TorznabError> {
        let indexers = self.resolve(indexes)?;
        let names: Vec<&str> = indexers.iter().map(|i| i.name()).collect();
        let title = format!("nabgate: {}", names.join(", "));
        caps_xml(&title, &merged_caps(&indexers)).map_err(TorznabError::unknown)
    }
}

fn merged_caps(indexers: &[Arc<dyn Indexer>]) -> Capabilities {
    let caps: Vec<Capabilities> = indexers.iter().map(|i| i.capabilities()).collect();
    Capabilities::merge(&caps)
}
