//! Response DTOs for the optimizer API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::config::OptimizerConfig;

/// Response body for POST /execute
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    /// Namespace the result was produced under
    pub namespace: String,
    /// Result of the wrapped operation
    pub result: Value,
}

/// Outcome of one item in POST /execute/batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Response body for POST /execute/batch, in request order
#[derive(Debug, Clone, Serialize)]
pub struct BatchExecuteResponse {
    pub results: Vec<BatchItemResponse>,
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearCacheResponse {
    /// Creates a new ClearCacheResponse
    pub fn new(namespace: Option<&str>, removed: usize) -> Self {
        let message = match namespace {
            Some(ns) => format!("Cleared {} entries in namespace '{}'", removed, ns),
            None => format!("Cleared {} entries", removed),
        };
        Self { message, removed }
    }
}

/// Response body for PUT /config
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigResponse {
    pub max_concurrent_calls: usize,
    pub cache_expiration_ms: u64,
    pub enable_metrics: bool,
    pub enable_deduplication: bool,
    pub enable_queueing: bool,
}

impl From<OptimizerConfig> for ConfigResponse {
    fn from(config: OptimizerConfig) -> Self {
        Self {
            max_concurrent_calls: config.max_concurrent_calls,
            cache_expiration_ms: config.cache_expiration.as_millis() as u64,
            enable_metrics: config.enable_metrics,
            enable_deduplication: config.enable_deduplication,
            enable_queueing: config.enable_queueing,
        }
    }
}

/// Generic acknowledgement body
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    /// Creates a new MessageResponse
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execute_response_serialize() {
        let resp = ExecuteResponse {
            namespace: "quiz".to_string(),
            result: json!({"questions": 3}),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["namespace"], "quiz");
        assert_eq!(json["result"]["questions"], 3);
    }

    #[test]
    fn test_batch_item_skips_empty_fields() {
        let ok = serde_json::to_string(&BatchItemResponse::ok(json!(1))).unwrap();
        assert!(!ok.contains("error"));
        let failed = serde_json::to_string(&BatchItemResponse::failed("boom")).unwrap();
        assert!(!failed.contains("result"));
        assert!(failed.contains("boom"));
    }

    #[test]
    fn test_clear_cache_message() {
        let resp = ClearCacheResponse::new(Some("quiz"), 4);
        assert!(resp.message.contains("quiz"));
        assert_eq!(resp.removed, 4);
        assert_eq!(ClearCacheResponse::new(None, 0).message, "Cleared 0 entries");
    }

    #[test]
    fn test_config_response_from_config() {
        let resp = ConfigResponse::from(OptimizerConfig::default());
        assert_eq!(resp.max_concurrent_calls, 3);
        assert_eq!(resp.cache_expiration_ms, 300_000);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
