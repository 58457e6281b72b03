//! # Dashboard HTTP Server
//!
//! Serves the cached stats document, game artwork and the pre-built
//! single-page app.
//!
//! ## Endpoints
//!
//! - `GET /api/stats` - Latest stats document (or `{"error": ...}` sentinel)
//! - `GET /api/assets/technology/:name` - Technology icon from the game data
//! - `GET /favicon.png` - Game icon
//! - `GET /health` - Cache status and uptime
//! - `GET /metrics` - Prometheus exposition
//! - anything else - File from the build directory, falling back to `index.html`
//!
//! ## Example
//!
//! ```no_run
//! use megabase::api::{create_router, AppState};
//! use megabase::cache::StatsCache;
//! use megabase::config::DashboardConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(DashboardConfig::default());
//! let cache = Arc::new(StatsCache::load(config.paths.stats_path()).await);
//!
//! let app = create_router(Arc::new(AppState::new(cache, config)));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod assets;
mod health;
mod stats;

pub use assets::AssetPaths;
pub use health::HealthResponse;

use crate::cache::StatsCache;
use crate::config::DashboardConfig;
use crate::metrics::MetricsCollector;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub cache: Arc<StatsCache>,
    pub config: Arc<DashboardConfig>,
    /// Where artwork and the built app are read from
    pub assets: AssetPaths,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    pub metrics_collector: Arc<MetricsCollector>,
}

impl AppState {
    /// Create application state, installing the metrics recorder if needed.
    pub fn new(cache: Arc<StatsCache>, config: Arc<DashboardConfig>) -> Self {
        let start_time = Instant::now();
        let prometheus_handle = crate::metrics::install_or_detached();

        Self {
            cache,
            assets: AssetPaths::from_config(&config.paths),
            config,
            start_time,
            metrics_collector: Arc::new(MetricsCollector::new(start_time, prometheus_handle)),
        }
    }
}

/// Create the router with all endpoints configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);

    Router::new()
        .route("/api/stats", get(stats::handle))
        .route("/api/assets/technology/:name", get(assets::technology))
        .route("/favicon.png", get(assets::favicon))
        .route("/health", get(health::handle))
        .route("/metrics", get(crate::metrics::handler::metrics_handler))
        .fallback(assets::build_file)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(state)
}
