//! The flat key-value storage contract every driver implements.

use crate::batch::WriteBatch;
use crate::error::Result;
use crate::iterator::KvIterator;
use crate::range::Range;

/// A single-namespace, ordered key-value store.
pub trait Storage: Send + Sync {
    /// Get the value stored under `key`.
    ///
    /// Fails with [`StorageError::NotFound`](crate::StorageError::NotFound)
    /// if the key is absent, so an empty value and a missing key stay distinct.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Check if `key` exists.
    fn has(&self, key: &[u8]) -> Result<bool>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Apply every operation in `batch` atomically.
    fn write(&self, batch: &WriteBatch) -> Result<()>;

    /// Create an empty batch bound to this handle.
    fn new_batch(&self) -> WriteBatch;

    /// Iterate over the keys in `range`, ascending.
    fn new_iterator(&self, range: &Range) -> Box<dyn KvIterator + '_>;

    /// Flush pending writes and release the handle.
    fn close(self: Box<Self>) -> Result<()>;
}
