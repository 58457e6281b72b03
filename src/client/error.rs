//! Error types for stats polling.

use thiserror::Error;

use crate::stats::SnapshotError;

/// Errors from one poll cycle.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Request timeout
    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Connection failed
    #[error("connection to {url} failed: {message}")]
    ConnectionFailed { url: String, message: String },

    /// Non-2xx response
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Endpoint entry could not be turned into a URL
    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    /// Response body is not a stats document
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Nothing to try
    #[error("no stats endpoints configured")]
    NoEndpoints,
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error, timeout_ms: u64) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_ms,
            }
        } else {
            FetchError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::ConnectionFailed { .. } => "connection",
            FetchError::HttpStatus { .. } => "http_status",
            FetchError::InvalidEndpoint { .. } => "invalid_endpoint",
            FetchError::Snapshot(_) => "snapshot",
            FetchError::NoEndpoints => "no_endpoints",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display() {
        let err = FetchError::HttpStatus {
            url: "http://localhost:3000/api/stats".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP 503 from http://localhost:3000/api/stats");
        assert_eq!(err.kind(), "http_status");
    }

    #[test]
    fn test_snapshot_error_is_transparent() {
        let err: FetchError = SnapshotError::Upstream("Stats file not found".to_string()).into();
        assert_eq!(err.to_string(), "stats unavailable: Stats file not found");
    }

    #[test]
    fn test_timeout_display() {
        let err = FetchError::Timeout {
            url: "http://x".to_string(),
            timeout_ms: 4000,
        };
        assert_eq!(err.to_string(), "request to http://x timed out after 4000ms");
    }
}
