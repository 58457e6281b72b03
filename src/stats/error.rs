//! Snapshot parsing errors

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// Body is not a valid stats document
    #[error("malformed stats document: {0}")]
    Malformed(String),

    /// Server reported that no stats are available
    #[error("stats unavailable: {0}")]
    Upstream(String),
}
