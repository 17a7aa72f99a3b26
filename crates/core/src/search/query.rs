//! Normalized search parameters.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use super::ScrapeItem;

/// Results returned when the caller does not ask for a limit.
pub const DEFAULT_LIMIT: u32 = 100;
/// Largest limit a caller may ask for.
pub const MAX_LIMIT: u32 = 1000;

/// Torznab search function (`t=` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Search,
    TvSearch,
    Movie,
    Music,
    Book,
}

impl QueryType {
    pub const ALL: [QueryType; 5] = [
        QueryType::Search,
        QueryType::TvSearch,
        QueryType::Movie,
        QueryType::Music,
        QueryType::Book,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Search => "search",
            QueryType::TvSearch => "tvsearch",
            QueryType::Movie => "movie",
            QueryType::Music => "music",
            QueryType::Book => "book",
        }
    }

    /// Name of the element in a capabilities document.
    pub fn caps_element(&self) -> &'static str {
        match self {
            QueryType::Search => "search",
            QueryType::TvSearch => "tv-search",
            QueryType::Movie => "movie-search",
            QueryType::Music => "music-search",
            QueryType::Book => "book-search",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "search" => Ok(QueryType::Search),
            "tvsearch" | "tv-search" => Ok(QueryType::TvSearch),
            "movie" | "movie-search" => Ok(QueryType::Movie),
            "music" | "music-search" => Ok(QueryType::Music),
            "book" | "book-search" => Ok(QueryType::Book),
            other => Err(format!("unknown search function '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query_type: QueryType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub categories: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
    /// Pages consumed per indexer; falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<u32>,
}

impl SearchQuery {
    pub fn new(query_type: QueryType, text: impl Into<String>) -> Self {
        Self {
            query_type,
            text: text.into(),
            categories: Vec::new(),
            imdb_id: None,
            tmdb_id: None,
            tvdb_id: None,
            season: None,
            episode: None,
            limit: None,
            offset: 0,
            max_pages: None,
            min_size: None,
            max_size: None,
            max_age_days: None,
        }
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = u32>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Effective limit, clamped to `MAX_LIMIT`.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize
    }

    /// Free text plus episode markers, as sent to text-only backends.
    pub fn search_text(&self) -> String {
        let mut text = self.text.trim().to_string();

        if self.query_type == QueryType::TvSearch {
            let marker = match (&self.season, &self.episode) {
                (Some(s), Some(e)) => match (s.parse::<u32>(), e.parse::<u32>()) {
                    (Ok(s), Ok(e)) => Some(format!("S{:02}E{:02}", s, e)),
                    _ => Some(format!("{} {}", s, e)),
                },
                (Some(s), None) => match s.parse::<u32>() {
                    Ok(s) => Some(format!("S{:02}", s)),
                    Err(_) => Some(s.clone()),
                },
                _ => None,
            };
            if let Some(marker) = marker {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&marker);
            }
        }

        text
    }

    /// Stable fingerprint used as the search cache key.
    ///
    /// Categories are sorted and deduplicated and the text is trimmed and
    /// lowercased, so queries that differ only in those respects share a key.
    pub fn unique_key(&self) -> String {
        let mut categories = self.categories.clone();
        categories.sort_unstable();
        categories.dedup();

        let opt = |v: Option<String>| v.unwrap_or_default();
        let canonical = [
            format!("t={}", self.query_type),
            format!("q={}", self.text.trim().to_lowercase()),
            format!(
                "cat={}",
                categories
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            format!(
                "imdb={}",
                opt(self
                    .imdb_id
                    .as_ref()
                    .map(|id| id.trim_start_matches("tt").to_string()))
            ),
            format!("tmdb={}", opt(self.tmdb_id.map(|v| v.to_string()))),
            format!("tvdb={}", opt(self.tvdb_id.map(|v| v.to_string()))),
            format!("season={}", opt(self.season.clone())),
            format!("ep={}", opt(self.episode.clone())),
            format!("limit={}", self.effective_limit()),
            format!("offset={}", self.offset),
            format!("pages={}", opt(self.max_pages.map(|v| v.to_string()))),
            format!("minsize={}", opt(self.min_size.map(|v| v.to_string()))),
            format!("maxsize={}", opt(self.max_size.map(|v| v.to_string()))),
            format!("maxage={}", opt(self.max_age_days.map(|v| v.to_string()))),
        ]
        .join("\n");

        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    /// Whether an item passes the size and age bounds of this query.
    pub fn accepts(&self, item: &ScrapeItem) -> bool {
        self.accepts_at(item, Utc::now())
    }

    pub(crate) fn accepts_at(&self, item: &ScrapeItem, now: DateTime<Utc>) -> bool {
        if let Some(min) = self.min_size {
            if item.size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if item.size > max {
                return false;
            }
        }
        if let (Some(days), Some(published)) = (self.max_age_days, item.publish_date) {
            if now - published > ChronoDuration::days(i64::from(days)) {
                return false;
            }
        }
        true
    }
}
