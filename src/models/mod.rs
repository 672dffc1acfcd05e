//! Request and Response models for the optimizer API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{BatchExecuteRequest, BatchItem, ClearCacheQuery, ExecuteRequest};
pub use responses::{
    BatchExecuteResponse, BatchItemResponse, ClearCacheResponse, ConfigResponse,
    ExecuteResponse, HealthResponse, MessageResponse,
};
