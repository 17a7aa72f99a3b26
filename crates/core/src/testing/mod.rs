//! Testing utilities and mock implementations.
//!
//! `MockIndexer` stands in for a real indexer so aggregation, the Torznab
//! responder and the HTTP layer can be exercised without network access.

mod mock_indexer;

pub use mock_indexer::MockIndexer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::search::ScrapeItem;

    /// A result with an HTTP link on `site`, identified by `local_id`.
    pub fn scrape_item(site: &str, local_id: &str, title: &str) -> ScrapeItem {
        ScrapeItem {
            title: title.to_string(),
            link: format!("https://{}.example/download/{}.torrent", site, local_id),
            source_link: None,
            site: site.to_string(),
            local_id: local_id.to_string(),
            publish_date: Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).single(),
            size: 1024 * 1024 * 700, // 700 MB
            seeders: 50,
            leechers: 10,
            categories: vec![2000],
            info_hash: None,
            magnet_uri: None,
            details_url: Some(format!("https://{}.example/t/{}", site, local_id)),
            imdb_id: None,
            tmdb_id: None,
        }
    }

    /// A result whose link is a magnet URI.
    pub fn magnet_item(site: &str, local_id: &str, title: &str) -> ScrapeItem {
        let hash = format!("{:0>40}", local_id);
        let magnet = format!("magnet:?xt=urn:btih:{}", hash);
        ScrapeItem {
            link: magnet.clone(),
            info_hash: Some(hash),
            magnet_uri: Some(magnet),
            ..scrape_item(site, local_id, title)
        }
    }
}
