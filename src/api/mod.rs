//! API Module
//!
//! HTTP handlers and routing for the optimizer REST API.
//!
//! # Endpoints
//! - `POST /execute` - Run one backend generation through the optimizer
//! - `POST /execute/batch` - Run a list of generations in chunks
//! - `GET /stats` - Cache contents and gate occupancy
//! - `GET /metrics` - Metrics snapshot
//! - `POST /metrics/reset` - Zero all metrics
//! - `DELETE /cache` - Clear the cache, optionally per namespace
//! - `GET|PUT /config` - Read or update executor settings
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{admin_router, create_router};
