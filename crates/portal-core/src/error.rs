//! Error types for the portal backend.

use thiserror::Error;

/// Result type alias using the portal's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for portal operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Notification not found
    #[error("Notification not found: {0}")]
    NotificationNotFound(uuid::Uuid),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Push delivery error
    #[error("Push error: {0}")]
    Push(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Push(e.to_string())
    }
}
