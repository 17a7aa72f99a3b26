//! Types for the indexer boundary.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;
use thiserror::Error;

use super::Capabilities;
use crate::search::{ScrapeItem, SearchQuery};

/// One page of results from an indexer.
#[derive(Debug, Clone, Default)]
pub struct ResultPage {
    pub items: Vec<ScrapeItem>,
}

impl ResultPage {
    pub fn new(items: Vec<ScrapeItem>) -> Self {
        Self { items }
    }
}

/// Pages in the order the indexer produces them. Dropping the stream stops
/// further fetching.
pub type PageStream = BoxStream<'static, Result<ResultPage, IndexerError>>;

/// An upstream file ready to be relayed to a client.
pub struct Download {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, IndexerError>>,
}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Errors raised by a single indexer.
#[derive(Debug, Clone, Error)]
pub enum IndexerError {
    #[error("Login to {indexer} failed: {message}")]
    Login { indexer: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl IndexerError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IndexerError::Login { .. } => "login",
            IndexerError::Transport(_) => "transport",
            IndexerError::Timeout => "timeout",
            IndexerError::Status { .. } => "status",
            IndexerError::Parse(_) => "parse",
            IndexerError::Unsupported(_) => "unsupported",
        }
    }

    pub fn is_login(&self) -> bool {
        matches!(self, IndexerError::Login { .. })
    }
}

/// A torrent indexing source.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Name clients use to select this indexer.
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Start a search. Errors returned here mean the search could not start;
    /// errors inside the stream end it early.
    async fn search(&self, query: &SearchQuery) -> Result<PageStream, IndexerError>;

    /// Fetch a file by the link this indexer reported for it.
    async fn download(&self, source_link: &str) -> Result<Download, IndexerError>;

    /// Cheap health probe.
    async fn check(&self) -> Result<(), IndexerError>;
}
