//! Cache Statistics Module
//!
//! Serializable views of the cache and executor state.

use serde::Serialize;

// == Entry Stats ==
/// Description of one cached entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryStats {
    /// Leading characters of the rendered key
    pub key_prefix: String,
    /// Number of valid lookups served
    pub hits: u64,
    /// Milliseconds since the entry was stored
    pub age_ms: u64,
    /// Whether the entry is still within its TTL
    pub valid: bool,
}

// == Cache Stats ==
/// Point-in-time view of the cache, the gate and its wait list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of stored entries, stale ones included
    pub cache_size: usize,
    /// Per-entry details
    pub entries: Vec<CacheEntryStats>,
    /// Wrapped operations currently holding a gate slot
    pub active_calls: usize,
    /// Callers waiting for a gate slot
    pub queued_requests: usize,
}

impl CacheStats {
    // == Valid Entries ==
    /// Number of entries still within their TTL.
    pub fn valid_entries(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }
}
