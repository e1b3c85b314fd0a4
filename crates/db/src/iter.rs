//! Cursor over a materialized set of entries.

use crate::bucket::Entry;
use walletdb_storage::{KvIterator, StorageError};

/// A [`KvIterator`] over entries already collected in key order.
///
/// Bucket cursors are built this way so that a write transaction's
/// uncommitted changes show up in its own scans.
pub struct EntryIterator {
    entries: Vec<Entry>,
    /// 0 = before the first entry, `i + 1` = positioned on `entries[i]`.
    cursor: usize,
    error: Option<StorageError>,
}

impl EntryIterator {
    /// Cursor over `entries`, which must be sorted by key.
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            cursor: 0,
            error: None,
        }
    }

    /// A cursor that yields nothing and reports `error`.
    pub fn failed(error: StorageError) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            error: Some(error),
        }
    }

    fn current(&self) -> Option<&Entry> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
    }
}

impl KvIterator for EntryIterator {
    fn seek(&mut self, key: &[u8]) -> bool {
        let idx = self.entries.partition_point(|e| e.key.as_slice() < key);
        self.cursor = idx + 1;
        self.current().is_some()
    }

    fn next(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        if self.cursor <= self.entries.len() {
            self.cursor += 1;
        }
        self.current().is_some()
    }

    fn key(&self) -> Option<&[u8]> {
        self.current().map(|e| e.key.as_slice())
    }

    fn value(&self) -> Option<&[u8]> {
        self.current().map(|e| e.value.as_slice())
    }

    fn error(&self) -> Option<&StorageError> {
        self.error.as_ref()
    }

    fn take_error(&mut self) -> Option<StorageError> {
        self.error.take()
    }
}
