//! Megabase dashboard - live telemetry for a factory-simulation megabase
//!
//! The server side watches the exporter's `stats.json`, caches the latest
//! good copy and serves it together with game artwork and the dashboard app.
//! The client side polls that endpoint, keeps a rolling history,
//! deduplicates alerts and detects gaps in the polled series.

pub mod alerts;
pub mod api;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod gaps;
pub mod logging;
pub mod metrics;
pub mod stats;
