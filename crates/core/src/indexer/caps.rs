//! Indexer capabilities.

use serde::Serialize;

use crate::search::{QueryType, DEFAULT_LIMIT, MAX_LIMIT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMode {
    pub key: QueryType,
    pub available: bool,
    pub supported_params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
    pub max: u32,
    pub default: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max: MAX_LIMIT,
            default: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub search_modes: Vec<SearchMode>,
    pub categories: Vec<Category>,
    pub limits: Limits,
}

fn params(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Capabilities {
    /// Every search mode with the usual parameters and the top-level
    /// Newznab categories.
    pub fn standard() -> Self {
        Self {
            search_modes: vec![
                SearchMode {
                    key: QueryType::Search,
                    available: true,
                    supported_params: params(&["q"]),
                },
                SearchMode {
                    key: QueryType::TvSearch,
                    available: true,
                    supported_params: params(&["q", "season", "ep", "tvdbid", "imdbid"]),
                },
                SearchMode {
                    key: QueryType::Movie,
                    available: true,
                    supported_params: params(&["q", "imdbid", "tmdbid"]),
                },
                SearchMode {
                    key: QueryType::Music,
                    available: true,
                    supported_params: params(&["q"]),
                },
                SearchMode {
                    key: QueryType::Book,
                    available: true,
                    supported_params: params(&["q"]),
                },
            ],
            categories: [
                (1000, "Console"),
                (2000, "Movies"),
                (3000, "Audio"),
                (4000, "PC"),
                (5000, "TV"),
                (6000, "XXX"),
                (7000, "Books"),
                (8000, "Other"),
            ]
            .into_iter()
            .map(|(id, name)| Category {
                id,
                name: name.to_string(),
            })
            .collect(),
            limits: Limits::default(),
        }
    }

    /// Only basic text search, no categories.
    pub fn search_only() -> Self {
        Self {
            search_modes: vec![SearchMode {
                key: QueryType::Search,
                available: true,
                supported_params: params(&["q"]),
            }],
            categories: Vec::new(),
            limits: Limits::default(),
        }
    }

    pub fn supports(&self, mode: QueryType) -> bool {
        self.search_modes
            .iter()
            .any(|m| m.key == mode && m.available)
    }

    /// Union of several indexers' capabilities.
    ///
    /// A mode is available if any indexer offers it; parameters and
    /// categories are unioned in first-seen order; limits take the smallest
    /// maximum.
    pub fn merge<'a>(caps: impl IntoIterator<Item = &'a Capabilities>) -> Capabilities {
        let mut merged = Capabilities {
            search_modes: Vec::new(),
            categories: Vec::new(),
            limits: Limits::default(),
        };

        for cap in caps {
            for mode in &cap.search_modes {
                match merged.search_modes.iter_mut().find(|m| m.key == mode.key) {
                    Some(existing) => {
                        existing.available |= mode.available;
                        for param in &mode.supported_params {
                            if !existing.supported_params.contains(param) {
                                existing.supported_params.push(param.clone());
                            }
                        }
                    }
                    None => merged.search_modes.push(mode.clone()),
                }
            }

            for category in &cap.categories {
                if !merged.categories.iter().any(|c| c.id == category.id) {
                    merged.categories.push(category.clone());
                }
            }

            merged.limits.max = merged.limits.max.min(cap.limits.max);
        }

        merged.limits.default = merged.limits.default.min(merged.limits.max);
        merged
            .search_modes
            .sort_by_key(|m| QueryType::ALL.iter().position(|t| *t == m.key));
        merged.categories.sort_by_key(|c| c.id);
        merged
    }
}
