//! Request Optimizer - bounded-concurrency, deduplicating, TTL-caching executor
//!
//! Wraps expensive external calls so bursts of identical or simultaneous
//! work do not overwhelm the downstream service.

pub mod api;
pub mod backend;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod gate;
pub mod inflight;
pub mod key;
pub mod metrics;
pub mod models;

pub use api::AppState;
pub use batch::{BatchOptions, BatchRequest};
pub use config::{Config, ConfigUpdate, OptimizerConfig};
pub use error::{ExecuteError, OptimizerError};
pub use executor::{ExecuteOptions, ExecuteResult, RequestOptimizer};
pub use key::CacheKey;
pub use metrics::MetricsSnapshot;
