//! Torznab request parsing.

use serde::Deserialize;
use std::str::FromStr;

use super::TorznabError;
use crate::search::{QueryType, SearchQuery};

/// Output encodings for search feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Xml,
    Atom,
    Json,
}

impl FeedFormat {
    /// `None` means the default, XML.
    pub fn from_param(value: Option<&str>) -> Result<Self, TorznabError> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("xml") | Some("rss") => Ok(FeedFormat::Xml),
            Some("atom") => Ok(FeedFormat::Atom),
            Some("json") => Ok(FeedFormat::Json),
            Some(other) => Err(TorznabError::incorrect_parameter(format!(
                "format '{}'",
                other
            ))),
        }
    }
}

/// Torznab API request parameters, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TorznabRequest {
    /// Function: caps, search, tvsearch, movie, music, book
    pub t: Option<String>,
    pub q: Option<String>,
    pub apikey: Option<String>,
    /// Categories (comma-separated)
    pub cat: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,

    // TV / movie
    pub season: Option<String>,
    pub ep: Option<String>,
    pub imdbid: Option<String>,
    pub tmdbid: Option<String>,
    pub tvdbid: Option<String>,

    // Filters
    pub minsize: Option<String>,
    pub maxsize: Option<String>,
    /// Maximum age in days
    pub maxage: Option<String>,

    /// xml (default), atom or json
    pub format: Option<String>,
    /// Pages to fetch per indexer
    pub pages: Option<String>,
}

impl TorznabRequest {
    /// The `t` parameter, if present and non-empty.
    pub fn function(&self) -> Option<&str> {
        self.t.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    pub fn is_caps(&self) -> bool {
        self.function()
            .is_some_and(|t| t.eq_ignore_ascii_case("caps"))
    }

    pub fn format(&self) -> Result<FeedFormat, TorznabError> {
        FeedFormat::from_param(self.format.as_deref())
    }

    /// Build the normalized query. Unknown functions and unparsable
    /// numbers are rejected rather than ignored.
    pub fn to_query(&self) -> Result<SearchQuery, TorznabError> {
        let function = self
            .function()
            .ok_or_else(|| TorznabError::incorrect_parameter("missing t"))?;
        let query_type = QueryType::from_str(function)
            .map_err(TorznabError::incorrect_parameter)?;

        let mut query = SearchQuery::new(query_type, self.q.clone().unwrap_or_default());

        if let Some(cat) = non_empty(&self.cat) {
            query.categories = cat
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| parse_param::<u32>("cat", c))
                .collect::<Result<_, _>>()?;
        }

        query.limit = parse_opt("limit", &self.limit)?;
        query.offset = parse_opt("offset", &self.offset)?.unwrap_or(0);
        query.max_pages = parse_opt("pages", &self.pages)?;
        if query.max_pages == Some(0) {
            return Err(TorznabError::incorrect_parameter("pages must be positive"));
        }

        query.season = non_empty(&self.season).map(str::to_string);
        query.episode = non_empty(&self.ep).map(str::to_string);
        query.imdb_id = non_empty(&self.imdbid).map(normalize_imdb_id).transpose()?;
        query.tmdb_id = parse_opt("tmdbid", &self.tmdbid)?;
        query.tvdb_id = parse_opt("tvdbid", &self.tvdbid)?;

        query.min_size = parse_opt("minsize", &self.minsize)?;
        query.max_size = parse_opt("maxsize", &self.maxsize)?;
        query.max_age_days = parse_opt("maxage", &self.maxage)?;

        Ok(query)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_param<T: FromStr>(name: &str, value: &str) -> Result<T, TorznabError> {
    value
        .parse()
        .map_err(|_| TorznabError::incorrect_parameter(format!("{}='{}'", name, value)))
}

fn parse_opt<T: FromStr>(name: &str, value: &Option<String>) -> Result<Option<T>, TorznabError> {
    non_empty(value).map(|v| parse_param(name, v)).transpose()
}

/// Accepts `tt0133093`, `0133093` and `133093`; always returns the
/// seven-digit `tt` form.
fn normalize_imdb_id(id: &str) -> Result<String, TorznabError> {
    let digits = id.strip_prefix("tt").unwrap_or(id);
    let number: u64 = parse_param("imdbid", digits)?;
    Ok(format!("tt{:07}", number))
}
