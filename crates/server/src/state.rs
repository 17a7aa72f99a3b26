use std::sync::Arc;

use nabgate_core::{
    ApiKeyAuthenticator, Config, FeedCache, IndexerRegistry, LinkRewriter, MemorySeenStore,
    SanitizedConfig, SearchAggregator, SecretProvider, StatusCache, StatusService,
    TorznabResponder,
};

/// Shared application state
pub struct AppState {
    config: Config,
    registry: Arc<dyn IndexerRegistry>,
    secrets: Arc<SecretProvider>,
    responder: TorznabResponder,
    status: StatusService,
}

impl AppState {
    /// Wire the caches, aggregator and responder for `config`. Caches are
    /// created here once and live as long as the state.
    pub fn new(config: Config, registry: Arc<dyn IndexerRegistry>) -> Self {
        let secrets = Arc::new(SecretProvider::from_config(&config.auth));
        let public_url = config.server.public_url();

        let aggregator = SearchAggregator::new(
            Arc::new(MemorySeenStore::default()),
            LinkRewriter::new(&public_url, secrets.clone()),
        )
        .with_max_pages(config.search.max_pages)
        .with_channel_capacity(config.search.channel_capacity);

        let search_cache = Arc::new(
            FeedCache::new(config.cache.search_capacity, config.cache.search_ttl())
                .with_label("search"),
        );
        let status_cache = Arc::new(
            StatusCache::new(config.cache.status_capacity, config.cache.status_ttl())
                .with_label("status"),
        );

        let responder = TorznabResponder::new(
            registry.clone(),
            ApiKeyAuthenticator::new(secrets.clone()),
            Arc::new(aggregator),
            search_cache,
            public_url,
        );
        let status = StatusService::new(registry.clone(), status_cache);

        Self {
            config,
            registry,
            secrets,
            responder,
            status,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn registry(&self) -> &dyn IndexerRegistry {
        self.registry.as_ref()
    }

    pub fn secrets(&self) -> &SecretProvider {
        &self.secrets
    }

    pub fn responder(&self) -> &TorznabResponder {
        &self.responder
    }

    pub fn status(&self) -> &StatusService {
        &self.status
    }
}
