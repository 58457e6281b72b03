//! `[logging]` section.
//!
//! The dashboard logs cache reloads, watcher events and poll outcomes
//! through `tracing`. This section picks the base level, the output shape,
//! and optional per-module overrides such as `cache = "debug"`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// How log lines are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    /// Case-insensitive, so `MEGABASE_LOG_FORMAT=JSON` works.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err(format!("unknown log format '{s}' (expected pretty or json)"))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level for everything, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
    /// Per-module levels keyed by module name under `megabase::`
    /// (`cache`, `client`, `api`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<HashMap<String, String>>,
    /// Colour pretty output; turn off when piping `watch` to a file
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            component_levels: None,
            ansi: true,
        }
    }
}
