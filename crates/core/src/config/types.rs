use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub jackett: Option<JackettConfig>,
    /// Alias name -> indexer names it expands to.
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
}

/// Shared secret sources. With neither set, a random secret is generated
/// at startup and every download link dies with the process.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable base URL used when building download links.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl ServerConfig {
    /// Base URL for links handed to clients, without a trailing slash.
    pub fn public_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let host = if self.host.is_unspecified() {
                    "localhost".to_string()
                } else {
                    self.host.to_string()
                };
                format!("http://{}:{}", host, self.port)
            }
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Capacities and lifetimes of the two response caches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_search_capacity")]
    pub search_capacity: usize,
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,
    #[serde(default = "default_status_capacity")]
    pub status_capacity: usize,
    #[serde(default = "default_status_ttl")]
    pub status_ttl_secs: u64,
}

impl CacheConfig {
    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_secs(self.status_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_capacity: default_search_capacity(),
            search_ttl_secs: default_search_ttl(),
            status_capacity: default_status_capacity(),
            status_ttl_secs: default_status_ttl(),
        }
    }
}

fn default_search_capacity() -> usize {
    300
}

fn default_search_ttl() -> u64 {
    60
}

fn default_status_capacity() -> usize {
    10
}

fn default_status_ttl() -> u64 {
    180
}

/// Aggregation tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Pages consumed per indexer when the query does not say otherwise.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Bound of the page queue shared by all producers of one search.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_max_pages() -> u32 {
    3
}

fn default_channel_capacity() -> usize {
    16
}

/// Jackett upstream configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JackettConfig {
    /// Jackett server URL (e.g., "http://localhost:9117")
    pub url: String,
    /// Jackett API key
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Indexers exposed through this gateway.
    #[serde(default)]
    pub indexers: Vec<JackettIndexerConfig>,
}

/// A single Jackett indexer exposed under its own name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JackettIndexerConfig {
    /// Name clients use in `/torznab/{indexes}`.
    pub name: String,
    /// Jackett's identifier for the indexer; defaults to `name`.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl JackettIndexerConfig {
    pub fn jackett_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

fn default_timeout() -> u32 {
    30
}

fn default_enabled() -> bool {
    true
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jackett: Option<SanitizedJackettConfig>,
    pub aliases: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub api_key_configured: bool,
    pub passphrase_configured: bool,
}

/// Sanitized Jackett config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJackettConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub indexers: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let configured = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        Self {
            auth: SanitizedAuthConfig {
                api_key_configured: configured(&config.auth.api_key),
                passphrase_configured: configured(&config.auth.passphrase),
            },
            server: config.server.clone(),
            cache: config.cache.clone(),
            search: config.search.clone(),
            jackett: config.jackett.as_ref().map(|j| SanitizedJackettConfig {
                url: j.url.clone(),
                api_key_configured: !j.api_key.is_empty(),
                timeout_secs: j.timeout_secs,
                indexers: j.indexers.iter().map(|i| i.name.clone()).collect(),
            }),
            aliases: config.aliases.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.cache.search_capacity, 300);
        assert_eq!(config.cache.status_capacity, 10);
        assert_eq!(config.cache.status_ttl(), Duration::from_secs(180));
        assert_eq!(config.search.max_pages, 3);
        assert!(config.auth.api_key.is_none());
        assert!(config.jackett.is_none());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[auth]
passphrase = "serverpass"

[server]
host = "127.0.0.1"
port = 9117
public_url = "https://nab.example.org/"

[cache]
search_ttl_secs = 30

[jackett]
url = "http://localhost:9117"
api_key = "jackett-key"

[[jackett.indexers]]
name = "rarbg"

[[jackett.indexers]]
name = "tpb"
id = "thepiratebay"
enabled = false

[aliases]
movies = ["rarbg", "tpb"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.passphrase.as_deref(), Some("serverpass"));
        assert_eq!(config.server.public_url(), "https://nab.example.org");
        assert_eq!(config.cache.search_ttl(), Duration::from_secs(30));
        assert_eq!(config.cache.search_capacity, 300);

        let jackett = config.jackett.as_ref().unwrap();
        assert_eq!(jackett.timeout_secs, 30);
        assert_eq!(jackett.indexers.len(), 2);
        assert_eq!(jackett.indexers[0].jackett_id(), "rarbg");
        assert!(jackett.indexers[0].enabled);
        assert_eq!(jackett.indexers[1].jackett_id(), "thepiratebay");
        assert!(!jackett.indexers[1].enabled);

        assert_eq!(config.aliases["movies"], vec!["rarbg", "tpb"]);
    }

    #[test]
    fn test_public_url_falls_back_to_listen_address() {
        let server = ServerConfig::default();
        assert_eq!(server.public_url(), "http://localhost:8080");

        let server = ServerConfig {
            host: "10.0.0.5".parse().unwrap(),
            port: 5000,
            public_url: None,
        };
        assert_eq!(server.public_url(), "http://10.0.0.5:5000");
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let config = Config {
            auth: AuthConfig {
                api_key: Some("top-secret".to_string()),
                passphrase: None,
            },
            jackett: Some(JackettConfig {
                url: "http://localhost:9117".to_string(),
                api_key: "jackett-secret".to_string(),
                timeout_secs: 60,
                indexers: vec![JackettIndexerConfig {
                    name: "rarbg".to_string(),
                    id: None,
                    enabled: true,
                }],
            }),
            ..Default::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.auth.api_key_configured);
        assert!(!sanitized.auth.passphrase_configured);
        let jackett = sanitized.jackett.as_ref().unwrap();
        assert!(jackett.api_key_configured);
        assert_eq!(jackett.indexers, vec!["rarbg"]);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("top-secret"));
        assert!(!json.contains("jackett-secret"));
    }
}
