//! Result items and feeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One result as an indexer reported it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeItem {
    pub title: String,
    /// Link the indexer hands out for this result.
    pub link: String,
    /// Canonical origin of the result, when it differs from `link`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
    /// Name of the indexer that produced the item.
    pub site: String,
    /// Indexer-local identifier (guid).
    pub local_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub seeders: u32,
    #[serde(default)]
    pub leechers: u32,
    #[serde(default)]
    pub categories: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
}

impl ScrapeItem {
    /// The link a download should ultimately fetch.
    pub fn canonical_link(&self) -> &str {
        match self.source_link.as_deref() {
            Some(link) if !link.is_empty() => link,
            _ => &self.link,
        }
    }

    /// URI schemes are case-insensitive, so `MAGNET:` counts too.
    pub fn is_magnet(&self) -> bool {
        self.link
            .get(..7)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("magnet:"))
    }

    /// Identity of the item across searches.
    pub fn key(&self) -> String {
        let local = if self.local_id.is_empty() {
            self.canonical_link()
        } else {
            &self.local_id
        };
        format!("{}/{}", self.site, local)
    }

    /// Content fingerprint; changes when title, size or link change.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0]);
        hasher.update(self.size.to_be_bytes());
        hasher.update([0]);
        hasher.update(self.canonical_link().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// How an item compares to what was seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    New,
    Updated,
    Unchanged,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::New => "new",
            ItemState::Updated => "updated",
            ItemState::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub item: ScrapeItem,
    pub uuid: Uuid,
    pub fingerprint: String,
    pub state: ItemState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultItem {
    Scraped(ScrapeItem),
    Tracked(TrackedItem),
}

impl ResultItem {
    pub fn as_scrape_item(&self) -> &ScrapeItem {
        match self {
            ResultItem::Scraped(item) => item,
            ResultItem::Tracked(tracked) => &tracked.item,
        }
    }

    /// Stable id for tracked items; scraped items get one derived from
    /// their key.
    pub fn uuid(&self) -> Uuid {
        match self {
            ResultItem::Scraped(item) => Uuid::new_v5(&Uuid::NAMESPACE_URL, item.key().as_bytes()),
            ResultItem::Tracked(tracked) => tracked.uuid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedMeta {
    pub id: String,
    pub title: String,
    pub link: String,
    pub language: String,
    pub category: String,
    /// When the feed was built; cached copies keep it.
    pub updated: DateTime<Utc>,
}

/// Feed answering one query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultFeed {
    meta: FeedMeta,
    items: Vec<ResultItem>,
}

impl ResultFeed {
    pub fn new(meta: FeedMeta, items: Vec<ResultItem>) -> Self {
        Self { meta, items }
    }

    pub fn meta(&self) -> &FeedMeta {
        &self.meta
    }

    pub fn items(&self) -> &[ResultItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{magnet_item, scrape_item};

    #[test]
    fn test_canonical_link_prefers_source_link() {
        let mut item = scrape_item("rarbg", "1", "Item");
        assert_eq!(item.canonical_link(), item.link);

        item.source_link = Some("https://origin.example/1".to_string());
        assert_eq!(item.canonical_link(), "https://origin.example/1");

        item.source_link = Some(String::new());
        assert_eq!(item.canonical_link(), item.link);
    }

    #[test]
    fn test_is_magnet() {
        assert!(magnet_item("rarbg", "1", "Item").is_magnet());
        assert!(!scrape_item("rarbg", "1", "Item").is_magnet());
    }

    #[test]
    fn test_key_falls_back_to_link() {
        let mut item = scrape_item("rarbg", "42", "Item");
        assert_eq!(item.key(), "rarbg/42");
        item.local_id.clear();
        assert_eq!(item.key(), format!("rarbg/{}", item.link));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let item = scrape_item("rarbg", "1", "Item");
        let same = item.clone();
        assert_eq!(item.fingerprint(), same.fingerprint());

        let mut bigger = item.clone();
        bigger.size += 1;
        assert_ne!(item.fingerprint(), bigger.fingerprint());

        let mut renamed = item.clone();
        renamed.title = "Other".to_string();
        assert_ne!(item.fingerprint(), renamed.fingerprint());

        let mut reseeded = item.clone();
        reseeded.seeders += 10;
        assert_eq!(item.fingerprint(), reseeded.fingerprint());
    }

    #[test]
    fn test_result_item_capabilities() {
        let item = scrape_item("rarbg", "1", "Item");
        let scraped = ResultItem::Scraped(item.clone());
        assert_eq!(scraped.as_scrape_item(), &item);
        assert_eq!(scraped.uuid(), ResultItem::Scraped(item.clone()).uuid());

        let id = Uuid::new_v4();
        let tracked = ResultItem::Tracked(TrackedItem {
            item: item.clone(),
            uuid: id,
            fingerprint: item.fingerprint(),
            state: ItemState::New,
        });
        assert_eq!(tracked.as_scrape_item(), &item);
        assert_eq!(tracked.uuid(), id);
    }
}
