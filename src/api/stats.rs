//! Stats document endpoint.

use crate::api::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// GET /api/stats - Serve the cached document verbatim.
///
/// Always 200: while nothing has loaded the body is the `{"error": ...}`
/// sentinel, which clients recognise.
pub async fn handle(State(state): State<Arc<AppState>>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        state.cache.current_stats(),
    )
        .into_response()
}
