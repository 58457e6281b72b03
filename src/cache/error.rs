//! Error types for the stats cache.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or watching the stats file.
#[derive(Debug, Error)]
pub enum CacheError {
    /// File missing or unreadable
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON (often caught mid-write)
    #[error("malformed stats file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// Could not install the filesystem watcher
    #[error("file watch failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("stats path has no file name: {0}")]
    InvalidPath(PathBuf),
}

impl CacheError {
    /// Message surfaced to HTTP clients while no stats have loaded.
    pub fn client_message(&self) -> String {
        match self {
            CacheError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                "Stats file not found".to_string()
            }
            CacheError::Io { .. } => "Stats file unreadable".to_string(),
            CacheError::Malformed { .. } => "Stats file malformed".to_string(),
            CacheError::Watch(_) | CacheError::InvalidPath(_) => "No stats available".to_string(),
        }
    }
}
