//! HTTP handlers for the operator endpoints

use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::{error, instrument};

use crate::controller::metrics;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
#[instrument]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint in the Prometheus text format
pub async fn metrics() -> Result<String, StatusCode> {
    metrics::encode_registry().map_err(|e| {
        error!("Failed to encode metrics: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
