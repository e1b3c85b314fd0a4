//! Ordered key/value cursors.

use crate::error::StorageError;

/// A cursor over key/value pairs in ascending key order.
///
/// A fresh cursor sits before the first entry; call [`next`](Self::next)
/// to move onto it. The cursor is released when dropped.
pub trait KvIterator {
    /// Position at the first key `>= key`. Returns whether such a key exists.
    fn seek(&mut self, key: &[u8]) -> bool;

    /// Advance to the next entry. Returns `false` once exhausted or on error.
    fn next(&mut self) -> bool;

    /// Key at the current position.
    fn key(&self) -> Option<&[u8]>;

    /// Value at the current position.
    fn value(&self) -> Option<&[u8]>;

    /// The fault that stopped iteration, if any.
    fn error(&self) -> Option<&StorageError>;

    /// Take ownership of the fault that stopped iteration, leaving `None`.
    fn take_error(&mut self) -> Option<StorageError>;
}
