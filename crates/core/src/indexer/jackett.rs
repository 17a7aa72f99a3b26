//! Jackett-backed indexer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{Capabilities, Download, Indexer, IndexerError, PageStream, ResultPage};
use crate::config::{JackettConfig, JackettIndexerConfig};
use crate::search::{ScrapeItem, SearchQuery};

/// Query parameter Jackett puts in its own download links.
const DOWNLOAD_KEY_PARAM: &str = "jackett_apikey";

/// One Jackett indexer exposed under its own name.
pub struct JackettIndexer {
    client: Client,
    base_url: String,
    api_key: String,
    name: String,
    jackett_id: String,
}

impl JackettIndexer {
    pub fn new(
        config: &JackettConfig,
        indexer: &JackettIndexerConfig,
    ) -> Result<Self, IndexerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| IndexerError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            name: indexer.name.clone(),
            jackett_id: indexer.jackett_id().to_string(),
        })
    }

    /// Build the Jackett API URL for a search.
    fn build_search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/api/v2.0/indexers/{}/results?apikey={}&Query={}",
            self.base_url,
            urlencoding::encode(&self.jackett_id),
            urlencoding::encode(&self.api_key),
            urlencoding::encode(&query.search_text())
        );

        for cat in &query.categories {
            url.push_str(&format!("&Category[]={}", cat));
        }
        if let Some(imdb_id) = &query.imdb_id {
            url.push_str(&format!("&imdbid={}", urlencoding::encode(imdb_id)));
        }
        if let Some(tmdb_id) = query.tmdb_id {
            url.push_str(&format!("&tmdbid={}", tmdb_id));
        }

        url
    }

    /// Put the API key back on a link that points at this Jackett server.
    /// Links to any other host are returned untouched.
    fn authorized_download_url(&self, link: &str) -> String {
        let (Ok(mut url), Ok(base)) = (Url::parse(link), Url::parse(&self.base_url)) else {
            return link.to_string();
        };
        if url.origin() != base.origin() || url.query_pairs().any(|(k, _)| k == DOWNLOAD_KEY_PARAM)
        {
            return link.to_string();
        }
        url.query_pairs_mut()
            .append_pair(DOWNLOAD_KEY_PARAM, &self.api_key);
        url.to_string()
    }

    fn build_caps_url(&self) -> String {
        format!(
            "{}/api/v2.0/indexers/{}/results/torznab/api?apikey={}&t=caps",
            self.base_url,
            urlencoding::encode(&self.jackett_id),
            urlencoding::encode(&self.api_key)
        )
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, IndexerError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(IndexerError::Login {
                indexer: self.name.clone(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> IndexerError {
    if e.is_timeout() {
        IndexerError::Timeout
    } else {
        IndexerError::Transport(e.to_string())
    }
}

#[async_trait]
impl Indexer for JackettIndexer {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::standard()
    }

    async fn search(&self, query: &SearchQuery) -> Result<PageStream, IndexerError> {
        let url = self.build_search_url(query);
        debug!(indexer = %self.name, "Searching Jackett");

        let response = self.get(&url).await?;
        let jackett_response: JackettResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::Parse(e.to_string()))?;

        debug!(
            indexer = %self.name,
            results = jackett_response.Results.len(),
            "Jackett search complete"
        );

        let items = jackett_response
            .Results
            .into_iter()
            .filter_map(|r| r.into_scrape_item(&self.name))
            .collect();

        // Jackett returns everything in one response.
        Ok(stream::once(async move { Ok(ResultPage::new(items)) }).boxed())
    }

    async fn download(&self, source_link: &str) -> Result<Download, IndexerError> {
        let response = self.get(&self.authorized_download_url(source_link)).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let content_length = response.content_length();

        Ok(Download {
            content_type,
            content_length,
            body: response.bytes_stream().map_err(map_reqwest_error).boxed(),
        })
    }

    async fn check(&self) -> Result<(), IndexerError> {
        let response = self.get(&self.build_caps_url()).await?;
        let body = response.text().await.map_err(map_reqwest_error)?;

        if body.contains("<error") {
            return Err(IndexerError::Parse(
                body.chars().take(200).collect::<String>(),
            ));
        }
        Ok(())
    }
}

/// Drop the Jackett API key from a download link so it never reaches a
/// client inside a download token.
fn strip_download_key(link: &str) -> String {
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };
    if !url.query_pairs().any(|(k, _)| k == DOWNLOAD_KEY_PARAM) {
        return link.to_string();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != DOWNLOAD_KEY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}

/// Parse Jackett's date format.
fn parse_jackett_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    Guid: Option<String>,
    Link: Option<String>,
    MagnetUri: Option<String>,
    InfoHash: Option<String>,
    Details: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
    #[serde(default)]
    Category: Vec<i64>,
    PublishDate: Option<String>,
    Imdb: Option<i64>,
    TMDb: Option<i64>,
}

impl JackettResult {
    /// Results without any link are dropped.
    fn into_scrape_item(self, site: &str) -> Option<ScrapeItem> {
        let link = self
            .Link
            .as_deref()
            .map(strip_download_key)
            .or_else(|| self.MagnetUri.clone())?;
        let seeders = self.Seeders.unwrap_or(0).max(0);
        let peers = self.Peers.unwrap_or(0).max(0);

        Some(ScrapeItem {
            title: self.Title,
            local_id: self.Guid.unwrap_or_else(|| link.clone()),
            link,
            source_link: None,
            site: site.to_string(),
            publish_date: self.PublishDate.and_then(|d| parse_jackett_date(&d)),
            size: self.Size.unwrap_or(0).max(0) as u64,
            seeders: seeders as u32,
            leechers: peers.saturating_sub(seeders).max(0) as u32,
            categories: self
                .Category
                .into_iter()
                .filter_map(|c| u32::try_from(c).ok())
                .collect(),
            info_hash: self.InfoHash.map(|h| h.to_lowercase()),
            magnet_uri: self.MagnetUri,
            details_url: self.Details,
            imdb_id: self.Imdb.filter(|id| *id > 0).map(|id| format!("tt{:07}", id)),
            tmdb_id: self.TMDb.and_then(|id| u64::try_from(id).ok()).filter(|id| *id > 0),
        })
    }
}
