//! Health check endpoint handler.

use crate::api::AppState;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` once stats have loaded, `waiting` before that
    pub status: String,
    pub stats_loaded: bool,
    pub stats_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_modified: Option<DateTime<Utc>>,
    pub uptime_seconds: u64,
}

/// GET /health - Report cache status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cached = state.cache.current();
    let status = if cached.is_loaded() { "ok" } else { "waiting" };

    Json(HealthResponse {
        status: status.to_string(),
        stats_loaded: cached.is_loaded(),
        stats_bytes: cached.len(),
        stats_modified: cached.modified(),
        uptime_seconds: state.metrics_collector.uptime_seconds(),
    })
}
