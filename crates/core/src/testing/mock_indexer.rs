//! Mock indexer for testing.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::indexer::{Capabilities, Download, Indexer, IndexerError, PageStream, ResultPage};
use crate::search::{ScrapeItem, SearchQuery};

#[derive(Debug, Clone)]
enum PageStep {
    Page(Vec<ScrapeItem>),
    Error(IndexerError),
}

/// Mock implementation of the Indexer trait.
///
/// Serves a scripted sequence of pages (and page errors), records every
/// query and counts how many pages were actually pulled, so tests can
/// assert that consumers stop early.
///
/// # Example
///
/// ```rust,ignore
/// use nabgate_core::testing::{fixtures, MockIndexer};
///
/// let indexer = MockIndexer::new("rarbg")
///     .with_page(vec![fixtures::scrape_item("rarbg", "1", "Ubuntu")])
///     .with_page_error(IndexerError::Timeout);
/// ```
pub struct MockIndexer {
    name: String,
    capabilities: Capabilities,
    steps: Vec<PageStep>,
    search_error: Option<IndexerError>,
    check_error: Option<IndexerError>,
    downloads: HashMap<String, Vec<u8>>,
    page_delay: Option<Duration>,
    searches: Arc<Mutex<Vec<SearchQuery>>>,
    pages_served: Arc<AtomicUsize>,
    downloads_served: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockIndexer")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("search_error", &self.search_error)
            .finish_non_exhaustive()
    }
}

impl MockIndexer {
    /// Create a mock with no pages and standard capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Capabilities::standard(),
            steps: Vec::new(),
            search_error: None,
            check_error: None,
            downloads: HashMap::new(),
            page_delay: None,
            searches: Arc::new(Mutex::new(Vec::new())),
            pages_served: Arc::new(AtomicUsize::new(0)),
            downloads_served: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_page(mut self, items: Vec<ScrapeItem>) -> Self {
        self.steps.push(PageStep::Page(items));
        self
    }

    /// The stream yields this error after the pages added so far.
    pub fn with_page_error(mut self, error: IndexerError) -> Self {
        self.steps.push(PageStep::Error(error));
        self
    }

    /// Fail the search before any page is produced.
    pub fn with_search_error(mut self, error: IndexerError) -> Self {
        self.search_error = Some(error);
        self
    }

    pub fn with_download(mut self, link: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.downloads.insert(link.into(), body.into());
        self
    }

    /// Sleep before every page.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    pub fn with_caps(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn fail_checks(mut self, error: IndexerError) -> Self {
        self.check_error = Some(error);
        self
    }

    /// Number of searches started.
    pub fn search_count(&self) -> usize {
        self.searches.lock().len()
    }

    pub fn recorded_searches(&self) -> Vec<SearchQuery> {
        self.searches.lock().clone()
    }

    /// Pages actually pulled from the stream by consumers.
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    pub fn downloads_served(&self) -> usize {
        self.downloads_served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Indexer for MockIndexer {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities.clone()
    }

    async fn search(&self, query: &SearchQuery) -> Result<PageStream, IndexerError> {
        self.searches.lock().push(query.clone());

        if let Some(error) = &self.search_error {
            return Err(error.clone());
        }

        let delay = self.page_delay;
        let served = self.pages_served.clone();
        let pages = stream::iter(self.steps.clone()).then(move |step| {
            let served = served.clone();
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                match step {
                    PageStep::Page(items) => {
                        served.fetch_add(1, Ordering::SeqCst);
                        Ok(ResultPage::new(items))
                    }
                    PageStep::Error(error) => Err(error),
                }
            }
        });

        Ok(pages.boxed())
    }

    async fn download(&self, source_link: &str) -> Result<Download, IndexerError> {
        let body = self
            .downloads
            .get(source_link)
            .cloned()
            .ok_or_else(|| IndexerError::Status {
                status: 404,
                body: format!("no such file: {}", source_link),
            })?;

        self.downloads_served.fetch_add(1, Ordering::SeqCst);
        Ok(Download {
            content_type: Some("application/x-bittorrent".to_string()),
            content_length: Some(body.len() as u64),
            body: stream::once(async move { Ok(Bytes::from(body)) }).boxed(),
        })
    }

    async fn check(&self) -> Result<(), IndexerError> {
        match &self.check_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::QueryType;
    use crate::testing::fixtures::scrape_item;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_scripted_pages() {
        let mock = MockIndexer::new("a")
            .with_page(vec![scrape_item("a", "1", "One")])
            .with_page_error(IndexerError::Timeout);

        let mut pages = mock
            .search(&SearchQuery::new(QueryType::Search, "q"))
            .await
            .unwrap();

        assert_eq!(pages.next().await.unwrap().unwrap().items.len(), 1);
        assert!(matches!(pages.next().await, Some(Err(IndexerError::Timeout))));
        assert!(pages.next().await.is_none());
        assert_eq!(mock.search_count(), 1);
        assert_eq!(mock.pages_served(), 1);
    }

    #[tokio::test]
    async fn test_pages_are_lazy() {
        let mock = MockIndexer::new("a")
            .with_page(vec![])
            .with_page(vec![]);
        let _pages = mock
            .search(&SearchQuery::new(QueryType::Search, "q"))
            .await
            .unwrap();
        assert_eq!(mock.pages_served(), 0);
    }

    #[tokio::test]
    async fn test_download() {
        let mock = MockIndexer::new("a").with_download("http://a/1", b"d8:announce".to_vec());

        let download = mock.download("http://a/1").await.unwrap();
        let chunks: Vec<Bytes> = download.body.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"d8:announce");
        assert_eq!(mock.downloads_served(), 1);

        assert!(matches!(
            mock.download("http://a/2").await,
            Err(IndexerError::Status { status: 404, .. })
        ));
    }
}
