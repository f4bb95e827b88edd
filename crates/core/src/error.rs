//! Error types for byoc-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for byoc-core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for byoc-core
#[derive(Error, Debug)]
pub enum Error {
    /// Token exchange with the identity provider failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The service rejected the bearer token, even after a refresh
    #[error("Access token expired or rejected")]
    ExpiredToken,

    /// Non-2xx response that is not an auth, not-found or validation failure
    #[error("Upstream error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// 404 from the service
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service rejected a create payload
    #[error("Validation failed: HTTP {status}: {body}")]
    Validation { status: u16, body: String },

    /// Region identifier outside the known set, or without a configured endpoint
    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    /// Cached token file exists but cannot be decoded
    #[error("Corrupt token cache {path}: {reason}")]
    CorruptCache { path: PathBuf, reason: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Timeout
    #[error("Operation timed out")]
    Timeout,
}

impl Error {
    /// True for 404-class failures, so callers can treat "already gone" as success.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_connect() {
            Error::Network(err.to_string())
        } else if err.is_decode() {
            Error::HttpClient(format!("failed to decode response body: {}", err))
        } else if err.is_request() || err.is_builder() {
            Error::HttpClient(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("collection c1".to_string()).is_not_found());
        assert!(!Error::Upstream {
            status: 500,
            body: String::new()
        }
        .is_not_found());
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = Error::Upstream {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream error: HTTP 503: maintenance");
    }
}
