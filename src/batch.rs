//! Batch Runner Module
//!
//! Drives the executor over a list of independent requests in fixed-size
//! chunks, one chunk at a time.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DEFAULT_TIMEOUT_MS;
use crate::executor::{ExecuteOptions, ExecuteResult, RequestOptimizer};

/// Default number of requests started together
pub const DEFAULT_BATCH_SIZE: usize = 5;

// == Batch Request ==
/// One unit of work in a batch.
pub struct BatchRequest<F> {
    pub namespace: String,
    pub params: Value,
    pub work: F,
}

impl<F> BatchRequest<F> {
    /// Creates a batch request.
    pub fn new(namespace: impl Into<String>, params: Value, work: F) -> Self {
        Self {
            namespace: namespace.into(),
            params,
            work,
        }
    }
}

// == Batch Options ==
/// Chunking and pacing for [`RequestOptimizer::execute_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Requests per chunk; zero is treated as one
    pub batch_size: usize,
    /// Pause between consecutive chunks
    pub delay_between_batches: Duration,
    /// Timeout applied to each request
    pub timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delay_between_batches: Duration::ZERO,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl<V, E> RequestOptimizer<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    // == Execute Batch ==
    /// Runs every request and returns their outcomes in input order.
    ///
    /// Requests in a chunk are started together and the whole chunk settles
    /// before the next one starts. They still share the concurrency gate, so
    /// real parallelism is bounded by both the chunk size and free slots.
    pub async fn execute_batch<F, Fut>(
        &self,
        requests: Vec<BatchRequest<F>>,
        options: BatchOptions,
    ) -> Vec<ExecuteResult<V, E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let batch_size = if options.batch_size == 0 {
            warn!("Batch size of 0 requested, using 1");
            1
        } else {
            options.batch_size
        };
        let execute_options = ExecuteOptions::with_timeout(options.timeout);

        let mut results = Vec::with_capacity(requests.len());
        let mut remaining = requests.into_iter().peekable();
        let mut chunk_index = 0usize;

        while remaining.peek().is_some() {
            if chunk_index > 0 && !options.delay_between_batches.is_zero() {
                tokio::time::sleep(options.delay_between_batches).await;
            }

            let chunk: Vec<BatchRequest<F>> = remaining.by_ref().take(batch_size).collect();
            debug!(chunk = chunk_index, size = chunk.len(), "Starting batch chunk");

            let calls = chunk.into_iter().map(|request| async move {
                self.execute(
                    &request.namespace,
                    &request.params,
                    request.work,
                    execute_options,
                )
                .await
            });
            results.extend(join_all(calls).await);
            chunk_index += 1;
        }

        results
    }
}
