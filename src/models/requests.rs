//! Request DTOs for the optimizer API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Maximum allowed namespace length in bytes
pub const MAX_NAMESPACE_LENGTH: usize = 128;

/// Request body for POST /execute
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// Logical partition of the key space
    pub namespace: String,
    /// Parameters handed to the backend and used to derive the key
    #[serde(default)]
    pub params: Value,
    /// Optional timeout in milliseconds (uses the server default if not specified)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ExecuteRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_namespace(&self.namespace)
    }
}

/// One item of a POST /execute/batch body
#[derive(Debug, Clone, Deserialize)]
pub struct BatchItem {
    pub namespace: String,
    #[serde(default)]
    pub params: Value,
}

/// Request body for POST /execute/batch
#[derive(Debug, Clone, Deserialize)]
pub struct BatchExecuteRequest {
    pub requests: Vec<BatchItem>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub delay_between_batches_ms: Option<u64>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl BatchExecuteRequest {
    /// Validates every item; reports the first problem found.
    pub fn validate(&self) -> Option<String> {
        if self.batch_size == Some(0) {
            return Some("batch_size must be at least 1".to_string());
        }
        self.requests
            .iter()
            .enumerate()
            .find_map(|(i, item)| {
                validate_namespace(&item.namespace).map(|msg| format!("requests[{}]: {}", i, msg))
            })
    }
}

/// Query string for DELETE /cache
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearCacheQuery {
    /// Namespace to clear; everything when absent
    #[serde(default)]
    pub namespace: Option<String>,
}

fn validate_namespace(namespace: &str) -> Option<String> {
    if namespace.is_empty() {
        return Some("Namespace cannot be empty".to_string());
    }
    if namespace.len() > MAX_NAMESPACE_LENGTH {
        return Some(format!(
            "Namespace exceeds maximum length of {} characters",
            MAX_NAMESPACE_LENGTH
        ));
    }
    None
}
