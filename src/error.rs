//! Error types for the request optimizer
//!
//! Provides unified error handling using thiserror.

use std::fmt::Display;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Execute Error Enum ==
/// Outcome of a failed `execute` call.
///
/// The same value is handed to every caller attached to the failing key,
/// which is why the wrapped operation's error type must be `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError<E> {
    /// The wrapped operation did not settle within the timeout
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The wrapped operation itself failed; the error is passed through untouched
    #[error("{0}")]
    Work(E),

    /// The task driving the wrapped operation ended without an outcome
    #[error("Operation was abandoned before producing an outcome")]
    Abandoned,
}

impl<E> ExecuteError<E> {
    /// Returns true if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecuteError::Timeout(_))
    }

    /// Returns the wrapped operation's error, if that is what failed.
    pub fn work_error(&self) -> Option<&E> {
        match self {
            ExecuteError::Work(err) => Some(err),
            _ => None,
        }
    }
}

// == Optimizer Error Enum ==
/// Error type for configuration and the HTTP surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptimizerError {
    /// Invalid options passed to `configure`
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Wrapped operation timed out
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Wrapped operation failed
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl<E: Display> From<ExecuteError<E>> for OptimizerError {
    fn from(err: ExecuteError<E>) -> Self {
        match err {
            ExecuteError::Timeout(_) => OptimizerError::Timeout(err.to_string()),
            ExecuteError::Work(inner) => OptimizerError::Upstream(inner.to_string()),
            ExecuteError::Abandoned => OptimizerError::Internal(err.to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for OptimizerError {
    fn into_response(self) -> Response {
        let status = match &self {
            OptimizerError::Configuration(_) => StatusCode::BAD_REQUEST,
            OptimizerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OptimizerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            OptimizerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            OptimizerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for configuration and API operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;
