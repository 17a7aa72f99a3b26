//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock indexers injected, so the whole HTTP surface can be exercised
//! without a Jackett server.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use nabgate_core::{
    testing::{fixtures, MockIndexer},
    AuthConfig, Capabilities, Config, IndexerError, IndexerSet, ServerConfig,
};
use nabgate_server::state::AppState;

/// API key derived from the fixture passphrase "serverpass".
pub const API_KEY: &str = "cd2234c6b7755b8dd230bdbc84544c38";

pub const PUBLIC_URL: &str = "http://nab.example";

/// Torrent body served for rarbg item 1.
pub const TORRENT_BODY: &[u8] = b"d8:announce31:http://tracker.example/announcee";

/// Test fixture for E2E testing with mock indexers.
///
/// - `rarbg`: standard caps, one page with two web items and a magnet;
///   only item 1 can be downloaded
/// - `tpb`: search-only caps, every search fails to log in
/// - alias `linux` covers both
pub struct TestFixture {
    pub router: Router,
    pub rarbg: Arc<MockIndexer>,
    pub tpb: Arc<MockIndexer>,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    pub fn new() -> Self {
        let item1 = fixtures::scrape_item("rarbg", "1", "Ubuntu 24.04");
        let rarbg = Arc::new(
            MockIndexer::new("rarbg")
                .with_page(vec![
                    item1.clone(),
                    fixtures::scrape_item("rarbg", "2", "Debian 12"),
                    fixtures::magnet_item("rarbg", "3", "Fedora 40"),
                ])
                .with_download(item1.link.clone(), TORRENT_BODY.to_vec()),
        );
        let tpb = Arc::new(
            MockIndexer::new("tpb")
                .with_caps(Capabilities::search_only())
                .with_search_error(IndexerError::Login {
                    indexer: "tpb".to_string(),
                    message: "captcha required".to_string(),
                }),
        );

        let config = Config {
            auth: AuthConfig {
                api_key: None,
                passphrase: Some("serverpass".to_string()),
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
                public_url: Some(PUBLIC_URL.to_string()),
            },
            aliases: [(
                "linux".to_string(),
                vec!["rarbg".to_string(), "tpb".to_string()],
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };

        let registry = IndexerSet::new()
            .with_indexer(rarbg.clone())
            .with_indexer(tpb.clone())
            .with_aliases(&config.aliases);

        let state = Arc::new(AppState::new(config, Arc::new(registry)));
        let router = nabgate_server::api::create_router(state);

        Self { router, rarbg, tpb }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, &[]).await
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> TestResponse {
        self.request("GET", path, &[(name, value)]).await
    }

    pub async fn head(&self, path: &str) -> TestResponse {
        self.request("HEAD", path, &[]).await
    }

    /// Search `indexes` with the fixture key and extra query parameters.
    pub async fn search(&self, indexes: &str, params: &str) -> TestResponse {
        let sep = if params.is_empty() { "" } else { "&" };
        self.get(&format!(
            "/torznab/{}/api?apikey={}{}{}",
            indexes, API_KEY, sep, params
        ))
        .await
    }

    async fn request(&self, method: &str, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Pull every `<link>` value out of an RSS body.
pub fn rss_links(xml: &str) -> Vec<String> {
    xml.split("<link>")
        .skip(1)
        .filter_map(|s| s.split("</link>").next())
        .map(str::to_string)
        .collect()
}

/// Path part of a download link issued under `PUBLIC_URL`.
pub fn local_path(link: &str) -> String {
    link.strip_prefix(PUBLIC_URL)
        .expect("link should be under the public URL")
        .to_string()
}
