//! Error types
//!
//! Only [`Error::Configuration`] is fatal. Transport and storage failures are
//! recovered where they happen and surface here only through the explicit
//! `try_*` entry points.

use thiserror::Error;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// The engine options are missing a source or a source is malformed
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Failure reported by a [`Transport`](crate::network::Transport)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} could not be decoded: {message}")]
    Decode { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },
}

impl TransportError {
    /// URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            Self::Request { url, .. }
            | Self::Status { url, .. }
            | Self::Decode { url, .. }
            | Self::Timeout { url } => url,
        }
    }
}

/// Failure reported by a [`Storage`](crate::storage::Storage) backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend cannot be used at all (missing directory, permissions, ...)
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure to serialize an index or restore it from a blob
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("serialized index is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("index could not be serialized: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Outcome of a failed initialization
///
/// Cloneable so a single settled initialization can be handed to every caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("prefetch failed: {0}")]
    Prefetch(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_url() {
        let err = TransportError::Status {
            url: "https://example.com/a".to_string(),
            status: 503,
        };
        assert_eq!(err.url(), "https://example.com/a");
        assert_eq!(err.to_string(), "request to https://example.com/a returned HTTP 503");
    }

    #[test]
    fn test_init_error_from_transport() {
        let err: InitError = TransportError::Timeout {
            url: "https://example.com".to_string(),
        }
        .into();
        assert!(err.to_string().contains("timed out"));
    }
}
