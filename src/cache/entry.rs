//! Cache Entry Module
//!
//! Defines a single cached outcome with its creation time and hit count.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A previously computed result and its metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored result
    pub value: V,
    /// When the result was stored
    pub created_at: Instant,
    /// Number of valid lookups served from this entry
    pub hit_count: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(value: V) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            hit_count: 0,
        }
    }

    // == Age ==
    /// Time elapsed since the entry was stored.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    // == Is Valid ==
    /// Checks whether the entry is still fresh under `ttl`.
    ///
    /// Boundary condition: an entry whose age equals the TTL is stale.
    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_creation() {
        let entry = CacheEntry::new("lesson plan".to_string());

        assert_eq!(entry.value, "lesson plan");
        assert_eq!(entry.hit_count, 0);
        assert!(entry.is_valid(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new(7u32);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(entry.is_valid(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!entry.is_valid(Duration::from_secs(1)), "stale at the boundary");
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_tracks_clock() {
        let entry = CacheEntry::new(());
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(entry.age(), Duration::from_millis(1500));
    }
}
