pub mod auth;
pub mod cache;
pub mod config;
pub mod indexer;
pub mod metrics;
pub mod search;
pub mod status;
pub mod testing;
pub mod token;
pub mod torznab;

pub use auth::{
    derive_shared_secret, ApiKeyAuthenticator, AuthError, SecretProvider, SecretSource,
    SharedSecret,
};
pub use cache::TtlCache;
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, CacheConfig, Config,
    ConfigError, JackettConfig, JackettIndexerConfig, SanitizedConfig, SearchConfig,
    ServerConfig,
};
pub use indexer::{
    Capabilities, Download, Indexer, IndexerError, IndexerRegistry, IndexerSet, JackettIndexer,
    PageStream, ResolveError, ResultPage,
};
pub use search::{
    AggregateError, AggregateResult, ItemState, LinkRewriter, MemorySeenStore, QueryType,
    ResultFeed, ResultItem, ScrapeItem, SearchAggregator, SearchQuery, SeenStore,
};
pub use status::{IndexerHealth, StatusCache, StatusReport, StatusService};
pub use token::{DownloadToken, TokenError};
pub use torznab::{
    EncodedFeed, FeedCache, FeedFormat, TorznabError, TorznabOutcome, TorznabRequest,
    TorznabResponder,
};
