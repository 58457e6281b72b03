//! # Metrics Collection Module
//!
//! Prometheus export for the dashboard server and the polling client.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `megabase_stats_reloads_total{result}` - Stats file reloads
//! - `megabase_polls_total{outcome}` - Client poll cycles
//! - `megabase_asset_requests_total{kind, result}` - Asset lookups
//!
//! **Histograms:**
//! - `megabase_poll_duration_seconds` - Time spent in one poll cycle
//!
//! **Gauges:**
//! - `megabase_stats_bytes` - Size of the cached stats document
//! - `megabase_stats_loaded` - 1 once a stats document is cached
//! - `megabase_stats_age_seconds` - Seconds since the cached file was modified

pub mod handler;

pub use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::cache::CachedStats;
use std::time::Instant;

/// Holds the Prometheus handle and computes point-in-time gauges.
pub struct MetricsCollector {
    start_time: Instant,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(start_time: Instant, prometheus_handle: PrometheusHandle) -> Self {
        Self {
            start_time,
            prometheus_handle,
        }
    }

    /// Refresh gauges derived from the cache cell.
    pub fn update_cache_gauges(&self, cached: &CachedStats) {
        metrics::gauge!("megabase_stats_loaded").set(if cached.is_loaded() { 1.0 } else { 0.0 });

        if let Some(modified) = cached.modified() {
            let age = chrono::Utc::now().signed_duration_since(modified);
            metrics::gauge!("megabase_stats_age_seconds")
                .set(age.num_milliseconds().max(0) as f64 / 1000.0);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Render Prometheus metrics in text format.
    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Install the global Prometheus recorder.
///
/// Poll durations use sub-second buckets since the stats document is small
/// and usually served from the local network.
pub fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    use metrics_exporter_prometheus::Matcher;

    let poll_buckets = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("megabase_poll_duration_seconds".to_string()),
            poll_buckets,
        )?
        .install_recorder()?;

    Ok(handle)
}

/// Install the recorder, or hand back a detached handle if one is already installed.
pub fn install_or_detached() -> PrometheusHandle {
    setup_metrics().unwrap_or_else(|e| {
        tracing::debug!("Metrics already initialized, creating new handle: {}", e);
        PrometheusBuilder::new().build_recorder().handle()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn collector() -> MetricsCollector {
        MetricsCollector::new(
            Instant::now(),
            PrometheusBuilder::new().build_recorder().handle(),
        )
    }

    #[test]
    fn test_metrics_collector_construction() {
        let collector = collector();
        assert!(collector.uptime_seconds() < 1);
    }

    #[test]
    fn test_detached_handle_renders() {
        let collector = collector();
        // Nothing is recorded into a detached recorder
        assert!(collector.render_metrics().is_empty());
    }

    #[test]
    fn test_update_cache_gauges_accepts_both_states() {
        let collector = collector();
        collector.update_cache_gauges(&CachedStats::Unavailable {
            message: "No stats available".to_string(),
        });
        collector.update_cache_gauges(&CachedStats::Loaded {
            body: Bytes::from_static(b"{}"),
            modified: Some(chrono::Utc::now()),
            loaded_at: chrono::Utc::now(),
        });
    }
}
