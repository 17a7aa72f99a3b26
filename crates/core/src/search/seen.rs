//! Change detection for result items.

use std::time::Duration;
use uuid::Uuid;

use super::{ItemState, ScrapeItem};
use crate::cache::TtlCache;

/// Remembers item fingerprints between searches.
pub trait SeenStore: Send + Sync {
    /// Compare an item with its previous sighting and record it.
    fn classify(&self, item: &ScrapeItem) -> (Uuid, ItemState);
}

#[derive(Debug, Clone)]
struct Sighting {
    uuid: Uuid,
    fingerprint: String,
}

/// In-process store, forgotten on restart.
pub struct MemorySeenStore {
    entries: TtlCache<String, Sighting>,
}

impl MemorySeenStore {
    pub const DEFAULT_CAPACITY: usize = 10_000;
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: TtlCache::new(capacity, ttl).with_label("seen"),
        }
    }
}

impl Default for MemorySeenStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_TTL)
    }
}

impl SeenStore for MemorySeenStore {
    fn classify(&self, item: &ScrapeItem) -> (Uuid, ItemState) {
        let key = item.key();
        let fingerprint = item.fingerprint();

        let (uuid, state) = match self.entries.get(&key) {
            None => (Uuid::new_v4(), ItemState::New),
            Some(seen) if seen.fingerprint == fingerprint => (seen.uuid, ItemState::Unchanged),
            Some(seen) => (seen.uuid, ItemState::Updated),
        };

        // Every sighting restarts the TTL, so only items that leave the
        // results are forgotten.
        self.entries.add(key, Sighting { uuid, fingerprint });
        (uuid, state)
    }
}
