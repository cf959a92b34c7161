use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tracker_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Not signed in. Run `tracker login <uid>` or `tracker login --anonymous`.")]
    NotSignedIn,
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Record not found for id/prefix: {0}")]
    RecordNotFound(String),
    #[error("{0}")]
    AmbiguousRecordId(String),
    #[error("Invalid due date: {0}")]
    InvalidDueDate(String),
    #[error("Nothing to change; pass at least one field to edit")]
    NothingToEdit,
    #[error("Sync engine task failed: {0}")]
    EngineTask(#[from] tokio::task::JoinError),
    #[error("Configuration error: {0}")]
    Config(String),
}
