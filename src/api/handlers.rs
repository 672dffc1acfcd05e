//! API Handlers
//!
//! HTTP request handlers for each optimizer endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;

use crate::backend::{BackendError, ContentBackend, SimulatedBackend};
use crate::batch::{BatchOptions, BatchRequest, DEFAULT_BATCH_SIZE};
use crate::cache::CacheStats;
use crate::config::{Config, ConfigUpdate};
use crate::error::{OptimizerError, Result};
use crate::executor::{ExecuteOptions, RequestOptimizer};
use crate::metrics::MetricsSnapshot;
use crate::models::{
    BatchExecuteRequest, BatchExecuteResponse, BatchItemResponse, ClearCacheQuery,
    ClearCacheResponse, ConfigResponse, ExecuteRequest, ExecuteResponse, HealthResponse,
    MessageResponse,
};

/// Executor type served by the HTTP service.
pub type ContentOptimizer = RequestOptimizer<Value, BackendError>;

/// Application state shared across the execute handlers.
///
/// Admin handlers only need the optimizer and take it as their state directly.
#[derive(Clone)]
pub struct AppState {
    /// Executor wrapping every backend call
    pub optimizer: ContentOptimizer,
    /// Downstream content backend
    pub backend: Arc<dyn ContentBackend>,
    /// Timeout for requests that do not specify one
    pub default_timeout: Duration,
}

impl AppState {
    /// Creates a new AppState.
    pub fn new(
        optimizer: ContentOptimizer,
        backend: Arc<dyn ContentBackend>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            optimizer,
            backend,
            default_timeout,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Uses the simulated backend with the configured latency.
    pub fn from_config(config: &Config) -> Result<Self> {
        let optimizer = RequestOptimizer::new(config.optimizer.clone())?;
        let backend = SimulatedBackend::new(Duration::from_millis(config.simulated_latency_ms));
        Ok(Self::new(
            optimizer,
            Arc::new(backend),
            Duration::from_millis(config.default_timeout_ms),
        ))
    }

    fn timeout(&self, timeout_ms: Option<u64>) -> Duration {
        timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout)
    }
}

/// Handler for POST /execute
///
/// Runs one backend generation through the optimizer.
pub async fn execute_handler(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(OptimizerError::InvalidRequest(error_msg));
    }

    let backend = Arc::clone(&state.backend);
    let namespace = req.namespace.clone();
    let params = req.params.clone();
    let work = move || backend.generate(&namespace, &params);

    let result = state
        .optimizer
        .execute(
            &req.namespace,
            &req.params,
            work,
            ExecuteOptions::with_timeout(state.timeout(req.timeout_ms)),
        )
        .await?;

    Ok(Json(ExecuteResponse {
        namespace: req.namespace,
        result,
    }))
}

/// Handler for POST /execute/batch
///
/// Runs a list of generations in chunks; per-item failures are reported
/// inline and do not fail the request.
pub async fn batch_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchExecuteRequest>,
) -> Result<Json<BatchExecuteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(OptimizerError::InvalidRequest(error_msg));
    }

    let options = BatchOptions {
        batch_size: req.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        delay_between_batches: Duration::from_millis(req.delay_between_batches_ms.unwrap_or(0)),
        timeout: state.timeout(req.timeout_ms),
    };

    let requests = req
        .requests
        .into_iter()
        .map(|item| {
            let backend = Arc::clone(&state.backend);
            let namespace = item.namespace.clone();
            let params = item.params.clone();
            BatchRequest::new(item.namespace, item.params, move || {
                backend.generate(&namespace, &params)
            })
        })
        .collect();

    let results = state
        .optimizer
        .execute_batch(requests, options)
        .await
        .into_iter()
        .map(|outcome| match outcome {
            Ok(value) => BatchItemResponse::ok(value),
            Err(err) => BatchItemResponse::failed(err.to_string()),
        })
        .collect();

    Ok(Json(BatchExecuteResponse { results }))
}

/// Handler for GET /stats
///
/// Returns cache contents and gate occupancy.
pub async fn stats_handler<V, E>(State(optimizer): State<RequestOptimizer<V, E>>) -> Json<CacheStats>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Json(optimizer.cache_stats())
}

/// Handler for GET /metrics
pub async fn metrics_handler<V, E>(
    State(optimizer): State<RequestOptimizer<V, E>>,
) -> Json<MetricsSnapshot>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Json(optimizer.metrics())
}

/// Handler for POST /metrics/reset
pub async fn reset_metrics_handler<V, E>(
    State(optimizer): State<RequestOptimizer<V, E>>,
) -> Json<MessageResponse>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    optimizer.reset_metrics();
    Json(MessageResponse::new("Metrics reset"))
}

/// Handler for DELETE /cache
///
/// Clears one namespace when `?namespace=` is given, everything otherwise.
pub async fn clear_cache_handler<V, E>(
    State(optimizer): State<RequestOptimizer<V, E>>,
    Query(query): Query<ClearCacheQuery>,
) -> Json<ClearCacheResponse>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let namespace = query.namespace.as_deref();
    let removed = optimizer.clear_cache(namespace);
    Json(ClearCacheResponse::new(namespace, removed))
}

/// Handler for GET /config
pub async fn get_config_handler<V, E>(
    State(optimizer): State<RequestOptimizer<V, E>>,
) -> Json<ConfigResponse>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Json(optimizer.config().into())
}

/// Handler for PUT /config
///
/// Applies a partial update; invalid updates change nothing.
pub async fn configure_handler<V, E>(
    State(optimizer): State<RequestOptimizer<V, E>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<ConfigResponse>>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let config = optimizer.configure(&update)?;
    Ok(Json(config.into()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use serde_json::json;

    fn test_state(latency_ms: u64) -> AppState {
        AppState::new(
            RequestOptimizer::new(OptimizerConfig::default()).unwrap(),
            Arc::new(SimulatedBackend::new(Duration::from_millis(latency_ms))),
            Duration::from_secs(5),
        )
    }

    fn execute_request(namespace: &str, params: Value, timeout_ms: Option<u64>) -> ExecuteRequest {
        ExecuteRequest {
            namespace: namespace.to_string(),
            params,
            timeout_ms,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_then_cached() {
        let state = test_state(10);
        let req = || execute_request("quiz", json!({"topic": "rust"}), None);

        let first = execute_handler(State(state.clone()), Json(req())).await.unwrap();
        let second = execute_handler(State(state.clone()), Json(req())).await.unwrap();

        assert_eq!(first.result, second.result);
        assert_eq!(first.result["sequence"], 1);
        assert_eq!(state.optimizer.metrics().cache_hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_invalid_request() {
        let state = test_state(10);
        let result = execute_handler(State(state), Json(execute_request("", json!({}), None))).await;
        assert!(matches!(result, Err(OptimizerError::InvalidRequest(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_timeout() {
        let state = test_state(1000);
        let result = execute_handler(
            State(state),
            Json(execute_request("quiz", json!({}), Some(100))),
        )
        .await;
        assert!(matches!(result, Err(OptimizerError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_backend_failure() {
        let state = test_state(10);
        let result = execute_handler(
            State(state),
            Json(execute_request("quiz", json!({"fail": true}), None)),
        )
        .await;
        assert!(matches!(result, Err(OptimizerError::Upstream(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_handler_reports_items_in_order() {
        let state = test_state(10);
        let req: BatchExecuteRequest = serde_json::from_value(json!({
            "requests": [
                {"namespace": "quiz", "params": {"i": 0}},
                {"namespace": "quiz", "params": {"i": 1, "fail": true}},
                {"namespace": "quiz", "params": {"i": 2}}
            ],
            "batch_size": 2
        }))
        .unwrap();

        let response = batch_handler(State(state), Json(req)).await.unwrap();
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.results[0].result.as_ref().unwrap()["params"]["i"], 0);
        assert!(response.results[1].error.is_some());
        assert_eq!(response.results[2].result.as_ref().unwrap()["params"]["i"], 2);
    }

    #[tokio::test]
    async fn test_configure_handler_rejects_invalid() {
        let state = test_state(10);
        let update = ConfigUpdate {
            max_concurrent_calls: Some(0),
            ..ConfigUpdate::default()
        };
        let result = configure_handler(State(state.optimizer.clone()), Json(update)).await;
        assert!(matches!(result, Err(OptimizerError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_stats_and_metrics_handlers() {
        let state = test_state(10);

        let stats = stats_handler(State(state.optimizer.clone())).await;
        assert_eq!(stats.cache_size, 0);

        let metrics = metrics_handler(State(state.optimizer.clone())).await;
        assert_eq!(metrics.total_requests, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
