//! Error types for repro-store
//!
//! Every failure surfaces to the caller immediately. Nothing is retried and
//! no partially written record is ever left behind.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// repro-store error types
#[derive(Error, Debug)]
pub enum Error {
    /// Record (or container) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Container file already exists at the target path
    #[error("Already exists: {0}\nUse open() or open_or_create() to append to an existing container")]
    AlreadyExists(String),

    /// Record id already present in the container (records are immutable)
    #[error("Duplicate record: {0}\nRecords are immutable once written; re-run to create a new record")]
    DuplicateRecord(String),

    /// Invalid parameter or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File is not a results container or has an incompatible schema version
    #[error("Container format error: {0}")]
    Format(String),

    /// Storage error while persisting a record
    #[error("Storage error: {0}")]
    StorageError(String),

    /// The experiment computation itself failed
    #[error("Experiment failed: {0}")]
    ExperimentFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
