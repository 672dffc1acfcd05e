//! In-Flight Registry Module
//!
//! Tracks at most one outstanding computation per key so concurrent callers
//! for the same key share its outcome instead of starting new work.

use std::collections::HashMap;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::ExecuteError;
use crate::key::CacheKey;

/// Outcome future shared by every caller attached to one computation.
pub type SharedOutcome<V, E> = Shared<BoxFuture<'static, Result<V, ExecuteError<E>>>>;

// == In-Flight Handle ==
/// A key's outstanding computation.
///
/// The generation distinguishes a handle from a later one registered for the
/// same key, so a computation that settles late never removes its successor.
pub struct InFlightHandle<V, E> {
    generation: u64,
    outcome: SharedOutcome<V, E>,
}

impl<V, E> InFlightHandle<V, E>
where
    V: Clone,
    E: Clone,
{
    /// Wraps an outcome future so it can be awaited by many callers.
    pub fn new(generation: u64, outcome: BoxFuture<'static, Result<V, ExecuteError<E>>>) -> Self {
        Self {
            generation,
            outcome: outcome.shared(),
        }
    }

    /// Generation this handle was registered under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A new waiter on the shared outcome.
    pub fn attach(&self) -> SharedOutcome<V, E> {
        self.outcome.clone()
    }
}

// == In-Flight Registry ==
/// Map of keys to their single outstanding computation.
pub struct InFlightRegistry<V, E> {
    entries: HashMap<CacheKey, InFlightHandle<V, E>>,
}

impl<V, E> Default for InFlightRegistry<V, E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V, E> InFlightRegistry<V, E>
where
    V: Clone,
    E: Clone,
{
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Binds `handle` to `key`, returning a waiter on its outcome.
    ///
    /// Callers check [`lookup`](Self::lookup) first under the same lock, so a
    /// live handle is never replaced.
    pub fn register(&mut self, key: CacheKey, handle: InFlightHandle<V, E>) -> SharedOutcome<V, E> {
        let waiter = handle.attach();
        self.entries.insert(key, handle);
        waiter
    }

    // == Lookup ==
    /// Returns a waiter on the outstanding computation for `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<SharedOutcome<V, E>> {
        self.entries.get(key).map(InFlightHandle::attach)
    }

    // == Release ==
    /// Removes the handle for `key` if it is still the one registered under
    /// `generation`. Returns true if something was removed.
    pub fn release(&mut self, key: &CacheKey, generation: u64) -> bool {
        match self.entries.get(key) {
            Some(handle) if handle.generation() == generation => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    // == Length ==
    /// Number of keys with outstanding work.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
