//! Error types for Showroom

use crate::service_worker::WorkerState;
use thiserror::Error;

/// Main error type for Showroom operations
#[derive(Debug, Error)]
pub enum ShowroomError {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    /// Cache storage errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    /// Local storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// Offload message protocol errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Network-specific errors
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection could not be established or was dropped
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// Request timed out
    #[error("request timed out")]
    Timeout,
    /// HTTP error with status code
    #[error("HTTP {0}: {1}")]
    Http(u16, String),
    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Cache storage errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// A pre-cached asset could not be fetched; the install is abandoned
    #[error("install failed, could not cache {url}: {reason}")]
    InstallFailed { url: String, reason: String },
    /// Lifecycle step attempted from the wrong state
    #[error("service worker cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: WorkerState,
    },
    /// Lock poisoned by a panicking writer
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Local storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Stored value is not valid for the key's format
    #[error("corrupt value under key {key}: {reason}")]
    Corrupt { key: String, reason: String },
    /// Backing file could not be read or written
    #[error("persistence failed: {0}")]
    Persistence(String),
    /// Lock poisoned by a panicking writer
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Offload protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Message type not understood by the worker
    #[error("Unknown message type: {0}")]
    UnknownType(String),
    /// Message without a `type` field
    #[error("Message is missing a type")]
    MissingType,
    /// Payload does not match the message type
    #[error("Invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: String, reason: String },
    /// Worker thread is gone
    #[error("Worker disconnected")]
    Disconnected,
    /// Worker answered with an error message
    #[error("{0}")]
    Worker(String),
    /// Worker answered a typed request with the wrong kind of result
    #[error("Expected {expected} response, got {received}")]
    UnexpectedResponse { expected: String, received: String },
}

/// Convenience Result type for Showroom operations
pub type Result<T> = std::result::Result<T, ShowroomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_message() {
        let err = ProtocolError::UnknownType("PING".to_string());
        assert_eq!(err.to_string(), "Unknown message type: PING");
    }

    #[test]
    fn test_nested_conversion() {
        let err: ShowroomError = NetworkError::Http(503, "Service Unavailable".into()).into();
        assert!(matches!(err, ShowroomError::Network(NetworkError::Http(503, _))));
        assert_eq!(
            err.to_string(),
            "Network error: HTTP 503: Service Unavailable"
        );
    }

    #[test]
    fn test_invalid_state_names_state() {
        let err: ShowroomError = CacheError::InvalidState {
            action: "activate",
            state: WorkerState::Redundant,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Cache error: service worker cannot activate while Redundant"
        );
    }

    #[test]
    fn test_install_failed_names_asset() {
        let err = CacheError::InstallFailed {
            url: "https://shop.example/manifest.json".into(),
            reason: "HTTP 404".into(),
        };
        assert!(err.to_string().contains("manifest.json"));
    }
}
