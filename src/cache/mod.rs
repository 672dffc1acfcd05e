//! Cache Module
//!
//! Provides the TTL result cache consulted before any work is started.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::{CacheEntryStats, CacheStats};
pub use store::ResultCache;

// == Public Constants ==
/// Number of leading key characters reported in cache statistics
pub const KEY_PREFIX_LEN: usize = 24;
