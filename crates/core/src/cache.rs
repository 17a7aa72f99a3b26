//! Bounded cache with per-entry expiry.
//!
//! Entries older than the TTL are treated as absent and dropped on the next
//! access. When full, an insert of a new key evicts the least recently used
//! entry.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::metrics::{CACHE_EVICTIONS, CACHE_LOOKUPS};

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    inserted_tick: u64,
    last_access: u64,
}

/// Entries plus two ordered indexes over them. Ticks only grow, so
/// `by_insert` is also ordered by `inserted_at`.
#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    by_access: BTreeMap<u64, K>,
    by_insert: BTreeMap<u64, K>,
    tick: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            by_access: BTreeMap::new(),
            by_insert: BTreeMap::new(),
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn insert(&mut self, key: K, value: V) {
        self.remove(&key);
        let tick = self.next_tick();
        self.by_access.insert(tick, key.clone());
        self.by_insert.insert(tick, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                inserted_tick: tick,
                last_access: tick,
            },
        );
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.by_access.remove(&entry.last_access);
                self.by_insert.remove(&entry.inserted_tick);
                true
            }
            None => false,
        }
    }

    fn touch(&mut self, key: &K) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.by_access.remove(&entry.last_access);
            entry.last_access = tick;
            self.by_access.insert(tick, key.clone());
        }
    }

    /// Walks from the oldest insertion and stops at the first fresh entry.
    fn purge_expired(&mut self, ttl: Duration) -> usize {
        let mut purged = 0;
        while let Some(key) = self.by_insert.values().next().cloned() {
            let expired = self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.inserted_at.elapsed() > ttl);
            if !expired {
                break;
            }
            self.remove(&key);
            purged += 1;
        }
        purged
    }

    fn evict_lru(&mut self) -> bool {
        match self.by_access.values().next().cloned() {
            Some(key) => self.remove(&key),
            None => false,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.by_access.clear();
        self.by_insert.clear();
    }
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    max_entries: usize,
    ttl: Duration,
    label: &'static str,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// `max_entries` is clamped to at least one.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            max_entries: max_entries.max(1),
            ttl,
            label: "default",
        }
    }

    /// Name used for the `cache` metrics label.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Insert or replace. Replacing restarts the entry's TTL.
    pub fn add(&self, key: K, value: V) {
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            let purged = inner.purge_expired(self.ttl);
            if purged > 0 {
                debug!(cache = self.label, purged, "Purged expired entries");
            }
            if inner.entries.len() >= self.max_entries && inner.evict_lru() {
                CACHE_EVICTIONS.with_label_values(&[self.label]).inc();
            }
        }

        inner.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();

        let fresh = inner
            .entries
            .get(key)
            .map(|entry| entry.inserted_at.elapsed() <= self.ttl);

        let found = match fresh {
            Some(true) => {
                inner.touch(key);
                inner.entries.get(key).map(|entry| entry.value.clone())
            }
            Some(false) => {
                inner.remove(key);
                None
            }
            None => None,
        };

        let result = if found.is_some() { "hit" } else { "miss" };
        CACHE_LOOKUPS.with_label_values(&[self.label, result]).inc();
        found
    }

    /// Like `get` without touching recency or metrics.
    pub fn contains(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        let fresh = match inner.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() <= self.ttl,
            None => return false,
        };
        if !fresh {
            inner.remove(key);
        }
        fresh
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.inner.lock().purge_expired(self.ttl)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_entry_visible_before_ttl_and_absent_after() {
        let cache = TtlCache::new(10, Duration::from_secs(60));
        cache.add("q", 1);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get(&"q"), Some(1));
        assert!(cache.contains(&"q"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(&"q"), None);
        assert!(!cache.contains(&"q"));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_does_not_extend_lifetime() {
        let cache = TtlCache::new(10, Duration::from_secs(10));
        cache.add("q", 1);

        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(3)).await;
            let _ = cache.get(&"q");
        }
        assert_eq!(cache.get(&"q"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_readd_refreshes_insertion_time() {
        let cache = TtlCache::new(10, Duration::from_secs(10));
        cache.add("q", 1);
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.add("q", 2);
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&"q"), Some(2));
    }

    #[test]
    fn test_overflow_evicts_exactly_one() {
        let cache = TtlCache::new(3, Duration::from_secs(60));
        cache.add(1, "a");
        cache.add(2, "b");
        cache.add(3, "c");
        cache.add(4, "d");

        assert_eq!(cache.len(), 3);
        let present = (1..=4).filter(|k| cache.contains(k)).count();
        assert_eq!(present, 3);
        assert!(!cache.contains(&1));
        assert!(cache.contains(&4));
    }

    #[test]
    fn test_eviction_prefers_least_recently_used() {
        let cache = TtlCache::new(3, Duration::from_secs(60));
        cache.add(1, "a");
        cache.add(2, "b");
        cache.add(3, "c");

        assert_eq!(cache.get(&1), Some("a"));
        cache.add(4, "d");

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
        assert!(cache.contains(&4));
    }

    #[test]
    fn test_replacing_key_never_evicts() {
        let cache = TtlCache::new(2, Duration::from_secs(60));
        cache.add(1, "a");
        cache.add(2, "b");
        cache.add(2, "B");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&2), Some("B"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_drops_expired_before_evicting() {
        let cache = TtlCache::new(2, Duration::from_secs(10));
        cache.add(1, "a");
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.add(2, "b");
        tokio::time::advance(Duration::from_secs(6)).await;

        // 1 is expired, 2 is fresh
        cache.add(3, "c");
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TtlCache::new(10, Duration::from_secs(10));
        cache.add(1, "a");
        cache.add(2, "b");
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.add(3, "c");

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = TtlCache::new(0, Duration::from_secs(10));
        assert_eq!(cache.capacity(), 1);
        cache.add(1, "a");
        cache.add(2, "b");
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_stops_at_first_fresh_entry() {
        let cache = TtlCache::new(10, Duration::from_secs(10));
        cache.add(1, "a");
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.add(2, "b");
        cache.add(1, "A");
        tokio::time::advance(Duration::from_secs(6)).await;

        // 1 was re-added after 2, so only the original 1 would have expired
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.len(), 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.purge_expired(), 2);
    }

    #[test]
    fn test_large_cache_eviction_follows_recency() {
        let cache = TtlCache::new(1000, Duration::from_secs(60));
        for i in 0..1000u32 {
            cache.add(i, i);
        }
        for i in 0..500u32 {
            assert_eq!(cache.get(&i), Some(i));
        }
        for i in 1000..1500u32 {
            cache.add(i, i);
        }

        assert_eq!(cache.len(), 1000);
        assert!((0..500u32).all(|k| cache.contains(&k)));
        assert!((500..1000u32).all(|k| !cache.contains(&k)));
    }

    #[test]
    fn test_clear() {
        let cache = TtlCache::new(10, Duration::from_secs(10)).with_label("test");
        cache.add(1, "a");
        cache.clear();
        assert!(cache.is_empty());
        cache.add(2, "b");
        assert_eq!(cache.get(&2), Some("b"));
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = Arc::new(TtlCache::new(50, Duration::from_secs(60)));
        let mut handles = Vec::new();

        for task in 0..8u32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100u32 {
                    cache.add(task * 1000 + i, i);
                    let _ = cache.get(&(task * 1000 + i));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len(), 50);
    }
}
