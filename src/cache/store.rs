//! Result Cache Module
//!
//! TTL-keyed store of previously computed outcomes.
//!
//! Staleness is checked lazily on read. There is no size bound and no sweep:
//! an entry lives until it is overwritten or cleared.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheEntryStats, KEY_PREFIX_LEN};
use crate::key::CacheKey;

// == Result Cache ==
/// Result storage keyed by [`CacheKey`].
#[derive(Debug)]
pub struct ResultCache<V> {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry<V>>,
    /// Time after which an entry is stale
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    // == Constructor ==
    /// Creates an empty cache whose entries go stale after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    // == Lookup ==
    /// Returns the entry stored for `key`, fresh or not.
    pub fn lookup(&self, key: &CacheKey) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Is Valid ==
    /// Checks an entry against the configured TTL.
    pub fn is_valid(&self, entry: &CacheEntry<V>) -> bool {
        entry.is_valid(self.ttl)
    }

    // == Get Valid ==
    /// Returns a clone of the cached result if the entry is still fresh.
    ///
    /// A successful read bumps the entry's hit count. Stale entries are left
    /// in place until the next store overwrites them.
    pub fn get_valid(&mut self, key: &CacheKey) -> Option<V> {
        let ttl = self.ttl;
        let entry = self.entries.get_mut(key)?;
        if !entry.is_valid(ttl) {
            return None;
        }
        entry.hit_count += 1;
        Some(entry.value.clone())
    }

    // == Store ==
    /// Stores `value` under `key`, replacing any previous entry.
    pub fn store(&mut self, key: CacheKey, value: V) {
        self.entries.insert(key, CacheEntry::new(value));
    }

    /// Stores a result whose callers gave up at `timed_out_at`.
    ///
    /// An entry stored at or after that instant came from a later
    /// computation and is kept. Returns true if `value` was stored.
    pub fn store_late(&mut self, key: CacheKey, value: V, timed_out_at: Instant) -> bool {
        match self.entries.get(&key) {
            Some(entry) if entry.created_at >= timed_out_at => false,
            _ => {
                self.store(key, value);
                true
            }
        }
    }

    // == Clear ==
    /// Removes every entry derived under `namespace`, or everything when
    /// `namespace` is `None`.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self, namespace: Option<&str>) -> usize {
        let before = self.entries.len();
        match namespace {
            Some(ns) => self.entries.retain(|key, _| key.namespace() != ns),
            None => self.entries.clear(),
        }
        before - self.entries.len()
    }

    // == TTL ==
    /// Current time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Changes the time-to-live; applies to existing entries on their next read.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    // == Entry Stats ==
    /// Describes every stored entry, stale ones included.
    pub fn entry_stats(&self) -> Vec<CacheEntryStats> {
        self.entries
            .iter()
            .map(|(key, entry)| CacheEntryStats {
                key_prefix: key.prefix(KEY_PREFIX_LEN),
                hits: entry.hit_count,
                age_ms: entry.age().as_millis() as u64,
                valid: entry.is_valid(self.ttl),
            })
            .collect()
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(ns: &str, id: u32) -> CacheKey {
        CacheKey::derive(ns, &json!({ "id": id }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_and_get() {
        let mut cache = ResultCache::new(Duration::from_secs(5));

        cache.store(key("quiz", 1), "value1".to_string());
        assert_eq!(cache.get_valid(&key("quiz", 1)).as_deref(), Some("value1"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_missing() {
        let mut cache: ResultCache<String> = ResultCache::new(Duration::from_secs(5));
        assert!(cache.get_valid(&key("quiz", 1)).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_count_increments() {
        let mut cache = ResultCache::new(Duration::from_secs(5));
        cache.store(key("quiz", 1), 10u32);

        cache.get_valid(&key("quiz", 1));
        cache.get_valid(&key("quiz", 1));

        let entry = cache.lookup(&key("quiz", 1)).unwrap();
        assert_eq!(entry.hit_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_kept_but_not_served() {
        let mut cache = ResultCache::new(Duration::from_secs(1));
        cache.store(key("quiz", 1), 10u32);

        tokio::time::advance(Duration::from_secs(1)).await;

        assert!(cache.get_valid(&key("quiz", 1)).is_none());
        let entry = cache.lookup(&key("quiz", 1)).unwrap();
        assert!(!cache.is_valid(entry));
        assert_eq!(cache.len(), 1, "no eager eviction");
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_overwrites_and_resets() {
        let mut cache = ResultCache::new(Duration::from_secs(1));
        cache.store(key("quiz", 1), 1u32);
        cache.get_valid(&key("quiz", 1));

        tokio::time::advance(Duration::from_secs(2)).await;
        cache.store(key("quiz", 1), 2u32);

        let entry = cache.lookup(&key("quiz", 1)).unwrap();
        assert_eq!(entry.value, 2);
        assert_eq!(entry.hit_count, 0);
        assert!(cache.is_valid(entry));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_late_keeps_newer_entry() {
        let mut cache = ResultCache::new(Duration::from_secs(60));
        let timed_out_at = Instant::now();

        tokio::time::advance(Duration::from_millis(10)).await;
        cache.store(key("quiz", 1), 2u32);
        tokio::time::advance(Duration::from_millis(400)).await;

        assert!(!cache.store_late(key("quiz", 1), 1u32, timed_out_at));
        assert_eq!(cache.get_valid(&key("quiz", 1)), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_late_fills_absent_or_older_entry() {
        let mut cache = ResultCache::new(Duration::from_secs(1));
        cache.store(key("quiz", 1), 1u32);
        tokio::time::advance(Duration::from_secs(2)).await;
        let timed_out_at = Instant::now();
        tokio::time::advance(Duration::from_millis(100)).await;

        assert!(cache.store_late(key("quiz", 1), 2u32, timed_out_at));
        assert!(cache.store_late(key("quiz", 2), 3u32, timed_out_at));
        assert_eq!(cache.get_valid(&key("quiz", 1)), Some(2));
        assert_eq!(cache.get_valid(&key("quiz", 2)), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_namespace() {
        let mut cache = ResultCache::new(Duration::from_secs(5));
        cache.store(key("ns-a", 1), 1u32);
        cache.store(key("ns-a", 2), 2u32);
        cache.store(key("ns-ab", 1), 3u32);
        cache.store(key("ns-b", 1), 4u32);

        assert_eq!(cache.clear(Some("ns-a")), 2);
        assert!(cache.get_valid(&key("ns-a", 1)).is_none());
        assert_eq!(cache.get_valid(&key("ns-ab", 1)), Some(3));
        assert_eq!(cache.get_valid(&key("ns-b", 1)), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all() {
        let mut cache = ResultCache::new(Duration::from_secs(5));
        cache.store(key("ns-a", 1), 1u32);
        cache.store(key("ns-b", 1), 2u32);

        assert_eq!(cache.clear(None), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_ttl_applies_to_existing_entries() {
        let mut cache = ResultCache::new(Duration::from_secs(60));
        cache.store(key("quiz", 1), 1u32);

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.set_ttl(Duration::from_secs(5));

        assert_eq!(cache.ttl(), Duration::from_secs(5));
        assert!(cache.get_valid(&key("quiz", 1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_stats() {
        let mut cache = ResultCache::new(Duration::from_secs(1));
        cache.store(key("quiz", 1), 1u32);
        cache.get_valid(&key("quiz", 1));
        tokio::time::advance(Duration::from_millis(1200)).await;

        let stats = cache.entry_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].hits, 1);
        assert_eq!(stats[0].age_ms, 1200);
        assert!(!stats[0].valid);
        assert!(stats[0].key_prefix.starts_with("quiz:"));
        assert_eq!(stats[0].key_prefix.len(), KEY_PREFIX_LEN);
    }
}
