//! Executor Module
//!
//! Orchestrates the cache, the in-flight registry and the concurrency gate
//! around an opaque unit of work.
//!
//! # Call path
//! 1. Derive the key from namespace and parameters
//! 2. Serve a fresh cached result, if any
//! 3. Attach to an in-flight computation for the key, if any
//! 4. Otherwise register a new computation and await it
//!
//! A new computation runs on its own task: it waits for a gate slot, runs
//! the work under the timeout, then updates the cache, metrics and registry
//! before handing the outcome to every attached caller. Timing out does not
//! stop the work: its gate slot is freed at once and the work finishes in the
//! background. A late success is cached unless a newer result got there first.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, ResultCache};
use crate::config::{ConfigUpdate, OptimizerConfig, DEFAULT_TIMEOUT_MS};
use crate::error::{ExecuteError, Result};
use crate::gate::ConcurrencyGate;
use crate::inflight::{InFlightHandle, InFlightRegistry};
use crate::key::CacheKey;
use crate::metrics::{MetricEvent, MetricsRecorder, MetricsSnapshot};

/// Outcome delivered to callers of [`RequestOptimizer::execute`].
pub type ExecuteResult<V, E> = std::result::Result<V, ExecuteError<E>>;

// == Execute Options ==
/// Per-call options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// How long the wrapped operation may run before callers get a timeout
    pub timeout: Duration,
}

impl ExecuteOptions {
    /// Options with the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

// == Shared State ==
/// Cache and registry live under one lock so "check cache, check in-flight,
/// register" and "store result, release in-flight" are each atomic.
struct Stores<V, E> {
    cache: ResultCache<V>,
    in_flight: InFlightRegistry<V, E>,
}

struct Inner<V, E> {
    config: RwLock<OptimizerConfig>,
    stores: Mutex<Stores<V, E>>,
    gate: ConcurrencyGate,
    metrics: MetricsRecorder,
    next_generation: AtomicU64,
}

impl<V, E> Inner<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn record(&self, enabled: bool, event: MetricEvent) {
        if enabled {
            self.metrics.record(event);
        }
    }

    /// Bookkeeping for a computation that settled within its timeout.
    fn complete(
        &self,
        key: &CacheKey,
        generation: Option<u64>,
        outcome: &ExecuteResult<V, E>,
        elapsed: Duration,
        record_metrics: bool,
    ) {
        if let Some(generation) = generation {
            let mut stores = self.stores.lock();
            if let Ok(value) = outcome {
                stores.cache.store(key.clone(), value.clone());
            }
            stores.in_flight.release(key, generation);
        }

        match outcome {
            Ok(_) => {
                self.record(record_metrics, MetricEvent::Miss);
                self.record(record_metrics, MetricEvent::Latency(elapsed));
            }
            Err(err) => {
                debug!(key = %key, error = %DisplayOutcome(err), "Operation failed");
                self.record(record_metrics, MetricEvent::Failure);
            }
        }
    }

    /// Bookkeeping for a computation whose callers have just timed out.
    fn time_out(&self, key: &CacheKey, generation: Option<u64>, record_metrics: bool) {
        if let Some(generation) = generation {
            self.stores.lock().in_flight.release(key, generation);
        }
        self.record(record_metrics, MetricEvent::Failure);
    }

    /// A timed-out computation finally settled.
    fn complete_late(
        &self,
        key: &CacheKey,
        cache_result: bool,
        timed_out_at: Instant,
        outcome: ExecuteResult<V, E>,
    ) {
        match outcome {
            Ok(value) => {
                let stored = cache_result
                    && self
                        .stores
                        .lock()
                        .cache
                        .store_late(key.clone(), value, timed_out_at);
                warn!(key = %key, stored, "Operation settled after its timeout");
            }
            Err(_) => {
                warn!(key = %key, "Operation failed after its timeout");
            }
        }
    }
}

/// Renders an outcome error without requiring `E: Display`.
struct DisplayOutcome<'a, E>(&'a ExecuteError<E>);

impl<E> std::fmt::Display for DisplayOutcome<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            ExecuteError::Timeout(after) => write!(f, "timed out after {:?}", after),
            ExecuteError::Work(_) => write!(f, "work error"),
            ExecuteError::Abandoned => write!(f, "abandoned"),
        }
    }
}

// == Request Optimizer ==
/// Bounded-concurrency, deduplicating, TTL-caching executor.
///
/// Every store is owned by the instance; clones share it. `V` is the wrapped
/// operation's result and `E` its error; both are cloned to fan one outcome
/// out to every attached caller.
pub struct RequestOptimizer<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for RequestOptimizer<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> RequestOptimizer<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an executor, rejecting invalid settings.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                stores: Mutex::new(Stores {
                    cache: ResultCache::new(config.cache_expiration),
                    in_flight: InFlightRegistry::new(),
                }),
                gate: ConcurrencyGate::new(config.max_concurrent_calls),
                metrics: MetricsRecorder::new(),
                next_generation: AtomicU64::new(0),
                config: RwLock::new(config),
            }),
        })
    }

    // == Execute ==
    /// Runs `work` for `namespace` and `params`, reusing a cached or
    /// in-flight outcome for the same key when deduplication is enabled.
    ///
    /// Fails with [`ExecuteError::Timeout`] if the work has not settled
    /// within `options.timeout` of starting, and with
    /// [`ExecuteError::Work`] carrying the work's own error otherwise.
    pub async fn execute<F, Fut>(
        &self,
        namespace: &str,
        params: &Value,
        work: F,
        options: ExecuteOptions,
    ) -> ExecuteResult<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        let config = self.inner.config.read().clone();
        if config.enable_metrics {
            self.inner.metrics.record_request();
        }
        let key = CacheKey::derive(namespace, params);

        if !config.enable_deduplication {
            return self.start(key, None, work, options, &config).await;
        }

        let waiter = {
            let mut stores = self.inner.stores.lock();

            if let Some(value) = stores.cache.get_valid(&key) {
                drop(stores);
                debug!(key = %key, "Cache hit");
                self.inner.record(config.enable_metrics, MetricEvent::Hit);
                return Ok(value);
            }

            match stores.in_flight.lookup(&key) {
                Some(waiter) => {
                    debug!(key = %key, "Attaching to in-flight computation");
                    self.inner.record(config.enable_metrics, MetricEvent::Dedup);
                    waiter
                }
                None => {
                    let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                    let outcome = self.start(key.clone(), Some(generation), work, options, &config);
                    stores
                        .in_flight
                        .register(key, InFlightHandle::new(generation, outcome))
                }
            }
        };

        waiter.await
    }

    /// Spawns the task driving one computation and returns its outcome.
    ///
    /// `generation` is set when the computation is registered in flight and
    /// its result should be cached.
    fn start<F, Fut>(
        &self,
        key: CacheKey,
        generation: Option<u64>,
        work: F,
        options: ExecuteOptions,
        config: &OptimizerConfig,
    ) -> BoxFuture<'static, ExecuteResult<V, E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let queueing = config.enable_queueing;
        let record_metrics = config.enable_metrics;
        let timeout = options.timeout;

        tokio::spawn(async move {
            let permit = if queueing {
                Some(inner.gate.acquire().await)
            } else {
                None
            };

            let started = Instant::now();
            let mut running = Box::pin(
                AssertUnwindSafe(async move { work().await })
                    .catch_unwind()
                    .map(settled),
            );

            match tokio::time::timeout(timeout, &mut running).await {
                Ok(outcome) => {
                    let elapsed = started.elapsed();
                    drop(permit);
                    inner.complete(&key, generation, &outcome, elapsed, record_metrics);
                    let _ = tx.send(outcome);
                }
                Err(_) => {
                    let timed_out_at = Instant::now();
                    drop(permit);
                    warn!(key = %key, ?timeout, "Operation timed out");
                    inner.time_out(&key, generation, record_metrics);
                    let _ = tx.send(Err(ExecuteError::Timeout(timeout)));

                    // The work runs on outside the gate and may never settle
                    let late = running.await;
                    inner.complete_late(&key, generation.is_some(), timed_out_at, late);
                }
            }
        });

        async move { rx.await.unwrap_or(Err(ExecuteError::Abandoned)) }.boxed()
    }

    // == Configure ==
    /// Applies a partial update and returns the effective settings.
    ///
    /// Invalid updates are rejected before anything changes.
    pub fn configure(&self, update: &ConfigUpdate) -> Result<OptimizerConfig> {
        let mut config = self.inner.config.write();
        let merged = config.merged(update)?;

        self.inner.stores.lock().cache.set_ttl(merged.cache_expiration);
        self.inner.gate.set_max(merged.max_concurrent_calls);
        *config = merged.clone();

        info!(
            "Optimizer configured: max_concurrent_calls={}, cache_expiration={:?}, metrics={}, deduplication={}, queueing={}",
            merged.max_concurrent_calls,
            merged.cache_expiration,
            merged.enable_metrics,
            merged.enable_deduplication,
            merged.enable_queueing
        );
        Ok(merged)
    }

    /// Current settings.
    pub fn config(&self) -> OptimizerConfig {
        self.inner.config.read().clone()
    }

    // == Clear Cache ==
    /// Drops cached results under `namespace`, or all of them.
    ///
    /// Returns the number of entries removed.
    pub fn clear_cache(&self, namespace: Option<&str>) -> usize {
        let removed = self.inner.stores.lock().cache.clear(namespace);
        info!(
            namespace = namespace.unwrap_or("*"),
            removed, "Cache cleared"
        );
        removed
    }

    // == Cache Stats ==
    /// Snapshot of cache contents and gate occupancy.
    pub fn cache_stats(&self) -> CacheStats {
        let (cache_size, entries) = {
            let stores = self.inner.stores.lock();
            (stores.cache.len(), stores.cache.entry_stats())
        };
        CacheStats {
            cache_size,
            entries,
            active_calls: self.inner.gate.active(),
            queued_requests: self.inner.gate.queued(),
        }
    }

    /// Number of keys with a computation in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.stores.lock().in_flight.len()
    }

    // == Metrics ==
    /// Snapshot of the recorded metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Zeroes every counter.
    pub fn reset_metrics(&self) {
        self.inner.metrics.reset();
    }
}

/// Folds a caught panic into the outcome type.
fn settled<V, E>(
    caught: std::thread::Result<std::result::Result<V, E>>,
) -> ExecuteResult<V, E> {
    match caught {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ExecuteError::Work(err)),
        Err(_) => Err(ExecuteError::Abandoned),
    }
}
