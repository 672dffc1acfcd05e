//! Content Backend Module
//!
//! The expensive downstream operation the executor wraps. The executor never
//! looks inside it; this trait is only how the HTTP service obtains one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use thiserror::Error;

// == Backend Error ==
/// Failure reported by a content backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend refused the request
    #[error("Backend rejected request: {0}")]
    Rejected(String),

    /// The backend could not be reached
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

// == Content Backend ==
/// Generates content for a namespace and parameters.
pub trait ContentBackend: Send + Sync {
    /// Starts a generation. The returned future owns everything it needs.
    fn generate(&self, namespace: &str, params: &Value) -> BoxFuture<'static, Result<Value, BackendError>>;
}

// == Simulated Backend ==
/// Stand-in backend that answers after a fixed latency.
///
/// The response echoes its inputs with a sequence number, so repeated
/// generations are distinguishable. Parameters containing `"fail": true`
/// are rejected.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    latency: Duration,
    generations: Arc<AtomicU64>,
}

impl SimulatedBackend {
    /// Creates a backend that takes `latency` per generation.
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of generations started so far.
    pub fn generations(&self) -> u64 {
        self.generations.load(Ordering::SeqCst)
    }
}

impl ContentBackend for SimulatedBackend {
    fn generate(&self, namespace: &str, params: &Value) -> BoxFuture<'static, Result<Value, BackendError>> {
        let sequence = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let latency = self.latency;
        let namespace = namespace.to_string();
        let params = params.clone();

        async move {
            tokio::time::sleep(latency).await;
            if params.get("fail").and_then(Value::as_bool) == Some(true) {
                return Err(BackendError::Rejected(format!(
                    "generation {} for '{}' was refused",
                    sequence, namespace
                )));
            }
            Ok(json!({
                "namespace": namespace,
                "params": params,
                "sequence": sequence,
                "generated_at": chrono::Utc::now().to_rfc3339(),
            }))
        }
        .boxed()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_backend_echoes_inputs() {
        let backend = SimulatedBackend::new(Duration::from_millis(100));

        let value = backend
            .generate("summary", &json!({"course": 7}))
            .await
            .unwrap();

        assert_eq!(value["namespace"], "summary");
        assert_eq!(value["params"]["course"], 7);
        assert_eq!(value["sequence"], 1);
        assert_eq!(backend.generations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_backend_failure() {
        let backend = SimulatedBackend::new(Duration::from_millis(10));

        let result = backend.generate("summary", &json!({"fail": true})).await;
        assert!(matches!(result, Err(BackendError::Rejected(_))));
    }
}
