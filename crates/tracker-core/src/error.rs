//! Error types for tracker-core

use thiserror::Error;

/// Result type alias using tracker-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tracker-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// An operation needed a signed-in identity and none was present
    #[error("No identity is signed in")]
    NoIdentity,

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A remote document could not be decoded into a record
    #[error("Decode error: {0}")]
    Decode(String),

    /// Remote subscription or write failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Notification delivery failure
    #[error("Notification error: {0}")]
    Notification(String),

    /// The engine's run loop is no longer accepting commands
    #[error("Sync engine has stopped")]
    EngineStopped,

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
