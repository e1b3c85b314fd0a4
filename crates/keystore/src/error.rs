//! Keystore error type.

use thiserror::Error;
use walletdb_db::DbError;

/// Errors that can occur while reading or writing keystore records.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("failed to store {record}: {source}")]
    Store {
        record: &'static str,
        #[source]
        source: DbError,
    },

    #[error("required {0} not stored in database")]
    MissingField(&'static str),

    #[error("malformed serialized {record} for key {key}")]
    Malformed { record: &'static str, key: String },

    #[error("{record} of {len} bytes exceeds the 4-byte length prefix")]
    BlobTooLarge { record: &'static str, len: usize },

    #[error("unsupported account type '{0}'")]
    UnsupportedAccountType(u8),

    #[error("account {0} not found")]
    AccountNotFound(u32),
}

impl KeystoreError {
    pub(crate) fn malformed(record: &'static str, key: &[u8]) -> Self {
        KeystoreError::Malformed {
            record,
            key: hex::encode(key),
        }
    }
}

pub type Result<T> = std::result::Result<T, KeystoreError>;
