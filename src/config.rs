//! Configuration Module
//!
//! Executor settings, runtime updates to them, and server configuration
//! loaded from environment variables.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OptimizerError, Result};

/// Default number of wrapped operations allowed in progress at once
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 3;

/// Default result cache TTL in milliseconds (5 minutes)
pub const DEFAULT_CACHE_EXPIRATION_MS: u64 = 5 * 60 * 1000;

/// Default per-call timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

// == Optimizer Config ==
/// Executor behaviour switches and limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Upper bound on wrapped operations in progress
    pub max_concurrent_calls: usize,
    /// Age at which a cached result goes stale
    pub cache_expiration: Duration,
    /// Record metrics
    pub enable_metrics: bool,
    /// Consult and populate the cache and in-flight registry
    pub enable_deduplication: bool,
    /// Pass calls through the concurrency gate
    pub enable_queueing: bool,
}

impl OptimizerConfig {
    // == Validate ==
    /// Rejects settings the executor cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_calls == 0 {
            return Err(OptimizerError::Configuration(
                "max_concurrent_calls must be at least 1".to_string(),
            ));
        }
        if self.cache_expiration.is_zero() {
            return Err(OptimizerError::Configuration(
                "cache_expiration must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    // == Apply ==
    /// Returns this config with every field set in `update` replaced.
    ///
    /// The result is validated; `self` is never modified.
    pub fn merged(&self, update: &ConfigUpdate) -> Result<Self> {
        let merged = Self {
            max_concurrent_calls: update
                .max_concurrent_calls
                .unwrap_or(self.max_concurrent_calls),
            cache_expiration: update
                .cache_expiration_ms
                .map(Duration::from_millis)
                .unwrap_or(self.cache_expiration),
            enable_metrics: update.enable_metrics.unwrap_or(self.enable_metrics),
            enable_deduplication: update
                .enable_deduplication
                .unwrap_or(self.enable_deduplication),
            enable_queueing: update.enable_queueing.unwrap_or(self.enable_queueing),
        };
        merged.validate()?;
        Ok(merged)
    }

    /// Loads settings from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    /// - `MAX_CONCURRENT_CALLS` (default: 3)
    /// - `CACHE_EXPIRATION_MS` (default: 300000)
    /// - `ENABLE_METRICS`, `ENABLE_DEDUPLICATION`, `ENABLE_QUEUEING` (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_calls: env_parse("MAX_CONCURRENT_CALLS")
                .unwrap_or(defaults.max_concurrent_calls),
            cache_expiration: env_parse("CACHE_EXPIRATION_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_expiration),
            enable_metrics: env_parse("ENABLE_METRICS").unwrap_or(defaults.enable_metrics),
            enable_deduplication: env_parse("ENABLE_DEDUPLICATION")
                .unwrap_or(defaults.enable_deduplication),
            enable_queueing: env_parse("ENABLE_QUEUEING").unwrap_or(defaults.enable_queueing),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            cache_expiration: Duration::from_millis(DEFAULT_CACHE_EXPIRATION_MS),
            enable_metrics: true,
            enable_deduplication: true,
            enable_queueing: true,
        }
    }
}

// == Config Update ==
/// Partial settings accepted by `configure`; unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub max_concurrent_calls: Option<usize>,
    #[serde(default)]
    pub cache_expiration_ms: Option<u64>,
    #[serde(default)]
    pub enable_metrics: Option<bool>,
    #[serde(default)]
    pub enable_deduplication: Option<bool>,
    #[serde(default)]
    pub enable_queueing: Option<bool>,
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Executor settings
    pub optimizer: OptimizerConfig,
    /// Timeout applied to `/execute` calls that do not name one, in milliseconds
    pub default_timeout_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Latency of the simulated content backend, in milliseconds
    pub simulated_latency_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - everything read by [`OptimizerConfig::from_env`]
    /// - `DEFAULT_TIMEOUT_MS` - Per-call timeout (default: 30000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SIMULATED_LATENCY_MS` - Simulated backend latency (default: 100)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            optimizer: OptimizerConfig::from_env(),
            default_timeout_ms: env_parse("DEFAULT_TIMEOUT_MS")
                .unwrap_or(defaults.default_timeout_ms),
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            simulated_latency_ms: env_parse("SIMULATED_LATENCY_MS")
                .unwrap_or(defaults.simulated_latency_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            server_port: 3000,
            simulated_latency_ms: 100,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
