//! API Routes
//!
//! Configures the Axum router with all optimizer endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    batch_handler, clear_cache_handler, configure_handler, execute_handler, get_config_handler,
    health_handler, metrics_handler, reset_metrics_handler, stats_handler, AppState,
};
use crate::executor::RequestOptimizer;

/// Creates the admin routes for any optimizer.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Cache contents and gate occupancy
/// - `GET /metrics` - Metrics snapshot
/// - `POST /metrics/reset` - Zero all metrics
/// - `DELETE /cache` - Clear the cache, optionally `?namespace=`
/// - `GET /config`, `PUT /config` - Read or update executor settings
pub fn admin_router<V, E>(optimizer: RequestOptimizer<V, E>) -> Router
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler::<V, E>))
        .route("/metrics", get(metrics_handler::<V, E>))
        .route("/metrics/reset", post(reset_metrics_handler::<V, E>))
        .route("/cache", delete(clear_cache_handler::<V, E>))
        .route(
            "/config",
            get(get_config_handler::<V, E>).put(configure_handler::<V, E>),
        )
        .with_state(optimizer)
}

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - everything in [`admin_router`]
/// - `POST /execute` - Run one generation through the optimizer
/// - `POST /execute/batch` - Run a list of generations in chunks
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let execute = Router::new()
        .route("/execute", post(execute_handler))
        .route("/execute/batch", post(batch_handler))
        .with_state(state.clone());

    Router::new()
        .merge(admin_router(state.optimizer))
        .merge(execute)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::config::OptimizerConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let state = AppState::new(
            RequestOptimizer::new(OptimizerConfig::default()).unwrap(),
            Arc::new(SimulatedBackend::new(Duration::from_millis(1))),
            Duration::from_secs(5),
        );
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_execute_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"namespace":"quiz","params":{"id":1}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_router_standalone() {
        let optimizer: RequestOptimizer<u32, String> =
            RequestOptimizer::new(OptimizerConfig::default()).unwrap();
        let app = admin_router(optimizer);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
