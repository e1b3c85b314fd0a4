//! Storage error type.

use std::path::PathBuf;
use thiserror::Error;

/// Raised by a registry lookup for a driver type nobody registered.
///
/// Kept as its own type so that both the flat storage registry and the
/// bucket DB registry can convert it into their own error enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("non-existent database type: {0}")]
pub struct UnknownDbType(pub String);

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    UnknownDbType(#[from] UnknownDbType),

    #[error("not found")]
    NotFound,

    #[error("invalid key")]
    InvalidKey,

    #[error("invalid batch")]
    InvalidBatch,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage does not exist: {}", .0.display())]
    DoesNotExist(PathBuf),

    #[error("storage already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("storage version check failed: found {found_type}/v{found_version}, expected {expected_type}/v{expected_version}")]
    VersionCheckFailed {
        found_type: String,
        found_version: i32,
        expected_type: String,
        expected_version: i32,
    },

    #[error("open storage failed: {0}")]
    OpenFailed(String),

    #[error("create storage failed: {0}")]
    CreateFailed(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Whether this error is the distinguished "key absent" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}
