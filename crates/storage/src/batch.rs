//! Atomic write batches.

use crate::error::{Result, StorageError};

/// Batch operation for atomic updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}

/// Accumulates puts and deletes that a [`Storage`](crate::Storage) applies
/// all-or-nothing in [`Storage::write`](crate::Storage::write).
///
/// A batch remembers which storage handle created it; writing it to a
/// different handle fails with [`StorageError::InvalidBatch`]. Dropping the
/// batch releases it.
#[derive(Debug, Clone)]
pub struct WriteBatch {
    owner: u64,
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch bound to the storage handle `owner`.
    ///
    /// Only storage implementations should call this; callers obtain
    /// batches through [`Storage::new_batch`](crate::Storage::new_batch).
    pub fn for_owner(owner: u64) -> Self {
        Self {
            owner,
            ops: Vec::new(),
        }
    }

    /// Queue a put.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }
        self.ops.push(BatchOp::Insert {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }
        self.ops.push(BatchOp::Remove { key: key.to_vec() });
        Ok(())
    }

    /// Drop every queued operation so the batch can be reused.
    pub fn reset(&mut self) {
        self.ops.clear();
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued operations, in insertion order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Fail unless the batch was created by the storage handle `owner`.
    pub fn check_owner(&self, owner: u64) -> Result<()> {
        if self.owner != owner {
            return Err(StorageError::InvalidBatch);
        }
        Ok(())
    }
}
