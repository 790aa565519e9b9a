//! Core error types for optport-core.
//!
//! Validation errors are terminal for the current import step. Store errors
//! surface per key through [`crate::importer::ImportOutcome`] and never abort
//! a batch.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for optport-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Import document or upload validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Settings store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No cached import exists for the given id (never uploaded, applied, or expired)
    #[error("No pending import with id '{0}'. It may have expired; please upload the file again.")]
    ImportNotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that end the current import step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The file is not JSON or carries no usable version
    #[error("Sorry, there has been an error. This file may not contain data or is corrupt.")]
    Corrupt,

    /// The file predates the oldest supported format
    #[error(
        "This JSON file (version {0}) is not supported by this version of the importer. \
         Please update the exporter on the source, or use an older importer."
    )]
    TooOld(i64),

    /// The file was written by a newer exporter
    #[error(
        "This JSON file (version {0}) is from a newer version of the exporter and may not be \
         compatible. Please update the importer."
    )]
    TooNew(i64),

    /// Structurally valid but nothing to import
    #[error("Sorry, there has been an error. This file appears valid, but does not seem to have any options.")]
    NoOptions,

    /// The upload mechanism reported an error
    #[error("Sorry, there has been an error. {0}")]
    UploadFailed(String),

    /// The uploaded file could not be found or read
    #[error("The export file could not be read at {path}: {message}")]
    FileUnreadable { path: PathBuf, message: String },

    /// Unknown selection mode or an empty specific selection
    #[error("The selection is malformed: {0}")]
    MalformedSelection(String),
}

/// Settings store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store refused the write
    #[error("write rejected for option '{name}': {reason}")]
    Rejected { name: String, reason: String },

    /// Failed to open the backing database
    #[error("Failed to open settings store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value could not be decoded
    #[error("Stored value for '{name}' is unreadable: {message}")]
    Codec { name: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// A deny pattern does not compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::ReadOnly =>
            {
                StoreError::Rejected {
                    name: String::new(),
                    reason: "store is read-only".to_string(),
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
