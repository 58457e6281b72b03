//! Configuration for the polling client.

use serde::{Deserialize, Serialize};

use super::history::HistoryPolicy;
use crate::alerts::DEFAULT_ALERT_CAPACITY;
use crate::gaps::DEFAULT_THRESHOLD_MULTIPLIER;

/// Configuration for [`StatsClient`](super::StatsClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL that relative endpoints are joined to
    pub origin: String,
    /// Candidate stats URLs, tried in order on every poll
    pub endpoints: Vec<String>,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub history: HistoryPolicy,
    pub alert_capacity: usize,
    pub gap_threshold_multiplier: f64,
    /// Gaps shorter than this are treated as scheduling jitter
    pub min_gap_ms: i64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:3000".to_string(),
            endpoints: vec![
                "http://localhost:3000/api/stats".to_string(),
                "/api/stats".to_string(),
            ],
            poll_interval_ms: 5000,
            request_timeout_ms: 4000,
            history: HistoryPolicy::default(),
            alert_capacity: DEFAULT_ALERT_CAPACITY,
            gap_threshold_multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
            min_gap_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[1], "/api/stats");
        assert_eq!(config.alert_capacity, 1000);
        assert_eq!(config.history, HistoryPolicy::MaxEntries { max_entries: 60 });
    }

    #[test]
    fn test_client_config_toml_max_age_policy() {
        let config: ClientConfig = toml::from_str(
            r#"
            poll_interval_ms = 1000
            endpoints = ["http://factory:3000/api/stats"]

            [history]
            policy = "max_age"
            max_age_ms = 3600000
            "#,
        )
        .unwrap();
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.endpoints, vec!["http://factory:3000/api/stats"]);
        assert_eq!(config.history, HistoryPolicy::MaxAge { max_age_ms: 3_600_000 });
        assert_eq!(config.gap_threshold_multiplier, 2.0);
    }
}
