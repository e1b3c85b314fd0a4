//! Bucket DB error type.

use thiserror::Error;
use walletdb_storage::{StorageError, UnknownDbType};

/// Errors that can occur during bucket DB operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    UnknownDbType(#[from] UnknownDbType),

    #[error("bucket already exist: {0}")]
    BucketExists(String),

    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    #[error("invalid bucket name: {0:?}")]
    InvalidBucketName(String),

    #[error("illegal bucket path: {0:?}")]
    IllegalBucketPath(Vec<String>),

    #[error("illegal key")]
    IllegalKey,

    #[error("write not allowed in a read transaction")]
    WriteNotAllowed,

    #[error("corrupted bucket record: {0}")]
    Corrupted(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
