//! Name and alias resolution for indexers.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::Indexer;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    #[error("No indexes selected")]
    Empty,
}

/// Maps selectors from request paths to indexer handles.
pub trait IndexerRegistry: Send + Sync {
    /// Resolve a comma-separated list of names and aliases, or `all`.
    /// Matching ignores case; duplicates keep their first position.
    fn resolve(&self, selector: &str) -> Result<Vec<Arc<dyn Indexer>>, ResolveError>;

    fn get(&self, name: &str) -> Option<Arc<dyn Indexer>>;

    fn all(&self) -> Vec<Arc<dyn Indexer>>;
}

/// Fixed set of indexers plus aliases, built at startup.
#[derive(Default)]
pub struct IndexerSet {
    indexers: Vec<Arc<dyn Indexer>>,
    aliases: HashMap<String, Vec<String>>,
}

impl IndexerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn Indexer>) -> Self {
        self.indexers.push(indexer);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>, targets: Vec<String>) -> Self {
        self.aliases.insert(alias.into().to_lowercase(), targets);
        self
    }

    pub fn with_aliases(mut self, aliases: &HashMap<String, Vec<String>>) -> Self {
        for (alias, targets) in aliases {
            self.aliases.insert(alias.to_lowercase(), targets.clone());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.indexers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexers.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn Indexer>> {
        self.indexers
            .iter()
            .find(|i| i.name().eq_ignore_ascii_case(name))
    }
}

fn push(indexer: &Arc<dyn Indexer>, out: &mut Vec<Arc<dyn Indexer>>) {
    if !out.iter().any(|i| i.name() == indexer.name()) {
        out.push(indexer.clone());
    }
}

impl IndexerRegistry for IndexerSet {
    fn resolve(&self, selector: &str) -> Result<Vec<Arc<dyn Indexer>>, ResolveError> {
        let mut resolved: Vec<Arc<dyn Indexer>> = Vec::new();

        for part in selector.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("all") {
                for indexer in &self.indexers {
                    push(indexer, &mut resolved);
                }
            } else if let Some(indexer) = self.find(part) {
                push(indexer, &mut resolved);
            } else if let Some(targets) = self.aliases.get(&part.to_lowercase()) {
                for target in targets {
                    let indexer = self
                        .find(target)
                        .ok_or_else(|| ResolveError::UnknownIndex(target.clone()))?;
                    push(indexer, &mut resolved);
                }
            } else {
                return Err(ResolveError::UnknownIndex(part.to_string()));
            }
        }

        if resolved.is_empty() {
            return Err(ResolveError::Empty);
        }
        Ok(resolved)
    }

    fn get(&self, name: &str) -> Option<Arc<dyn Indexer>> {
        self.find(name).cloned()
    }

    fn all(&self) -> Vec<Arc<dyn Indexer>> {
        self.indexers.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockIndexer;

    fn set() -> IndexerSet {
        IndexerSet::new()
            .with_indexer(Arc::new(MockIndexer::new("rarbg")))
            .with_indexer(Arc::new(MockIndexer::new("tpb")))
            .with_indexer(Arc::new(MockIndexer::new("nyaa")))
            .with_alias("Movies", vec!["tpb".to_string(), "rarbg".to_string()])
    }

    fn names(indexers: &[Arc<dyn Indexer>]) -> Vec<String> {
        indexers.iter().map(|i| i.name().to_string()).collect()
    }

    #[test]
    fn test_resolve_single_and_list() {
        let set = set();
        assert_eq!(names(&set.resolve("rarbg").unwrap()), vec!["rarbg"]);
        assert_eq!(
            names(&set.resolve("nyaa, RARBG").unwrap()),
            vec!["nyaa", "rarbg"]
        );
    }

    #[test]
    fn test_resolve_all() {
        assert_eq!(
            names(&set().resolve("all").unwrap()),
            vec!["rarbg", "tpb", "nyaa"]
        );
    }

    #[test]
    fn test_resolve_alias_and_dedup() {
        let set = set();
        assert_eq!(names(&set.resolve("movies").unwrap()), vec!["tpb", "rarbg"]);
        assert_eq!(
            names(&set.resolve("rarbg,movies,all").unwrap()),
            vec!["rarbg", "tpb", "nyaa"]
        );
    }

    #[test]
    fn test_resolve_unknown() {
        let set = set();
        assert_eq!(
            set.resolve("rarbg,nope").err(),
            Some(ResolveError::UnknownIndex("nope".to_string()))
        );
        assert_eq!(set.resolve(" , ").err(), Some(ResolveError::Empty));
        assert_eq!(
            IndexerSet::new().resolve("all").err(),
            Some(ResolveError::Empty)
        );
    }

    #[test]
    fn test_get() {
        let set = set();
        assert_eq!(set.get("TPB").unwrap().name(), "tpb");
        assert!(set.get("movies").is_none());
        assert_eq!(set.all().len(), 3);
    }
}
