//! Configuration module for the dashboard
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`MEGABASE_*`, `FACTORIO_PATH`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use megabase::config::DashboardConfig;
//!
//! let config = DashboardConfig::default();
//! assert_eq!(config.server.port, 3000);
//!
//! let toml = r#"
//! [paths]
//! factorio_path = "/opt/factorio"
//! "#;
//! let config: DashboardConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.paths.factorio_path.to_str(), Some("/opt/factorio"));
//! ```

pub mod error;
pub mod logging;
pub mod paths;
pub mod server;

pub use crate::client::ClientConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use paths::PathsConfig;
pub use server::ServerConfig;

use crate::client::HistoryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unified configuration for the server and the terminal client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerConfig,
    /// Game installation and build output locations
    pub paths: PathsConfig,
    /// Polling client settings
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

impl DashboardConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.to_path_buf(),
                    source,
                })?;
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: p.to_path_buf(),
                    source,
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are ignored and the current value is kept.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("FACTORIO_PATH") {
            if !path.is_empty() {
                self.paths.factorio_path = PathBuf::from(path);
            }
        }

        if let Ok(port) = std::env::var("MEGABASE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("MEGABASE_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("MEGABASE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MEGABASE_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(interval) = std::env::var("MEGABASE_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.client.poll_interval_ms = ms;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "port must be non-zero"));
        }

        let client = &self.client;
        if client.poll_interval_ms == 0 {
            return Err(invalid(
                "client.poll_interval_ms",
                "poll interval must be non-zero",
            ));
        }
        if client.endpoints.is_empty() {
            return Err(invalid(
                "client.endpoints",
                "at least one endpoint is required",
            ));
        }
        if let Some(i) = client.endpoints.iter().position(|e| e.trim().is_empty()) {
            return Err(invalid(
                &format!("client.endpoints[{}]", i),
                "endpoint cannot be empty",
            ));
        }
        match client.history {
            HistoryPolicy::MaxEntries { max_entries: 0 } => {
                return Err(invalid(
                    "client.history.max_entries",
                    "history must keep at least one entry",
                ));
            }
            HistoryPolicy::MaxAge { max_age_ms } if max_age_ms <= 0 => {
                return Err(invalid(
                    "client.history.max_age_ms",
                    "history age must be positive",
                ));
            }
            _ => {}
        }
        if client.alert_capacity == 0 {
            return Err(invalid(
                "client.alert_capacity",
                "alert capacity must be non-zero",
            ));
        }
        let multiplier = client.gap_threshold_multiplier;
        if multiplier.is_nan() || multiplier <= 0.0 {
            return Err(invalid(
                "client.gap_threshold_multiplier",
                "multiplier must be positive",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_dashboard_config_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.paths.factorio_path, PathBuf::from("."));
        assert_eq!(config.client.poll_interval_ms, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_parse_minimal_toml() {
        let toml = r#"
        [server]
        port = 9000
        "#;

        let config: DashboardConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.client.endpoints.len(), 2);
    }

    #[test]
    fn test_config_parse_example_toml() {
        let toml = include_str!("../../megabase.example.toml");
        let config: DashboardConfig = toml::from_str(toml).unwrap();
        assert!(config.server.port > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            "[server]\nport = 8080\n\n[client]\npoll_interval_ms = 1000\n",
        )
        .unwrap();

        let config = DashboardConfig::load(Some(temp.path())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.client.poll_interval_ms, 1000);
    }

    #[test]
    fn test_config_missing_file_error() {
        let result = DashboardConfig::load(Some(Path::new("/nonexistent/megabase.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server\nport = ").unwrap();

        let result = DashboardConfig::load(Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("is not valid TOML"), "{message}");
    }

    #[test]
    fn test_config_load_none_returns_defaults() {
        let config = DashboardConfig::load(None).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    // Env overrides share one test so parallel tests never race on the process environment
    #[test]
    fn test_config_env_overrides() {
        std::env::set_var("FACTORIO_PATH", "/games/factorio");
        std::env::set_var("MEGABASE_PORT", "4000");
        std::env::set_var("MEGABASE_HOST", "127.0.0.1");
        std::env::set_var("MEGABASE_LOG_LEVEL", "debug");
        std::env::set_var("MEGABASE_LOG_FORMAT", "json");
        std::env::set_var("MEGABASE_POLL_INTERVAL_MS", "2500");
        let config = DashboardConfig::default().with_env_overrides();

        assert_eq!(config.paths.factorio_path, PathBuf::from("/games/factorio"));
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.client.poll_interval_ms, 2500);

        std::env::set_var("MEGABASE_PORT", "not-a-number");
        std::env::set_var("MEGABASE_LOG_FORMAT", "xml");
        std::env::set_var("MEGABASE_POLL_INTERVAL_MS", "soon");
        let config = DashboardConfig::default().with_env_overrides();

        for var in [
            "FACTORIO_PATH",
            "MEGABASE_PORT",
            "MEGABASE_HOST",
            "MEGABASE_LOG_LEVEL",
            "MEGABASE_LOG_FORMAT",
            "MEGABASE_POLL_INTERVAL_MS",
        ] {
            std::env::remove_var(var);
        }

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.client.poll_interval_ms, 5000);
    }

    fn assert_invalid(config: &DashboardConfig, expected: &str) {
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == expected
        ));
    }

    #[test]
    fn test_config_validation_zero_port() {
        let mut config = DashboardConfig::default();
        config.server.port = 0;
        assert_invalid(&config, "server.port");
    }

    #[test]
    fn test_config_validation_client_rules() {
        let mut config = DashboardConfig::default();
        config.client.poll_interval_ms = 0;
        assert_invalid(&config, "client.poll_interval_ms");

        let mut config = DashboardConfig::default();
        config.client.endpoints.clear();
        assert_invalid(&config, "client.endpoints");

        let mut config = DashboardConfig::default();
        config.client.endpoints.push("  ".to_string());
        assert_invalid(&config, "client.endpoints[2]");

        let mut config = DashboardConfig::default();
        config.client.alert_capacity = 0;
        assert_invalid(&config, "client.alert_capacity");

        let mut config = DashboardConfig::default();
        config.client.gap_threshold_multiplier = f64::NAN;
        assert_invalid(&config, "client.gap_threshold_multiplier");

        for multiplier in [0.0, -1.5] {
            let mut config = DashboardConfig::default();
            config.client.gap_threshold_multiplier = multiplier;
            assert_invalid(&config, "client.gap_threshold_multiplier");
        }
    }

    #[test]
    fn test_config_validation_history_bounds() {
        let mut config = DashboardConfig::default();
        config.client.history = HistoryPolicy::MaxEntries { max_entries: 0 };
        assert_invalid(&config, "client.history.max_entries");

        config.client.history = HistoryPolicy::MaxAge { max_age_ms: 0 };
        assert_invalid(&config, "client.history.max_age_ms");

        config.client.history = HistoryPolicy::MaxAge { max_age_ms: 60_000 };
        assert!(config.validate().is_ok());
    }
}
