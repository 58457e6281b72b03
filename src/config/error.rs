//! Errors raised while reading or checking `megabase.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no config file at {}", .0.display())]
    NotFound(PathBuf),

    #[error("{} is not valid TOML: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A setting parsed but is out of range, e.g. `client.poll_interval_ms = 0`
    #[error("invalid value for '{field}': {message}")]
    Validation { field: String, message: String },
}
