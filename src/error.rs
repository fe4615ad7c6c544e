//! Error types for the catalog sync engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Engine error types
#[derive(Error, Debug)]
pub enum SyncError {
    /// Input rejected before any state mutation (e.g. empty credentials)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote call failed
    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    /// Operation queue precondition failed (e.g. retrying a pending operation)
    #[error("Sync error: {0}")]
    Sync(String),

    /// Key-value persistence failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Realtime channel transport error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Referenced entity or operation does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Persistence(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

/// Structured failure returned by the request/response transport.
///
/// Travels inside rejected actions and is persisted with failed operations,
/// so it stays cloneable and serializable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}", describe(.status, .message))]
pub struct ApiError {
    /// HTTP-like status code when the transport has one
    pub status: Option<u16>,
    pub message: String,
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("HTTP {} - {}", status, message),
        None => message.to_string(),
    }
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Transport could not reach the server at all
    pub fn unreachable() -> Self {
        Self::new("server unreachable")
    }
}
