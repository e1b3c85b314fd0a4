//! sled-backed [`Storage`] driver.

use crate::batch::{BatchOp, WriteBatch};
use crate::config::SledConfig;
use crate::error::{Result, StorageError};
use crate::iterator::KvIterator;
use crate::range::Range;
use crate::registry::Driver;
use crate::storage::Storage;
use crate::version::{check_version, version_file};
use crate::StorageDriver;
use sled::{Db, IVec};
use std::any::Any;
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Type identifier of the sled driver.
pub const SLED_DB_TYPE: &str = "sled";

/// Source of per-handle ids that bind batches to the handle that made them.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Wrapper around a sled database implementing [`Storage`].
pub struct SledStorage {
    db: Db,
    handle: u64,
    sync_on_write: bool,
}

impl SledStorage {
    /// Initialize a new store at `path` and stamp it with the format version.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if `path` already holds a
    /// stamped store.
    pub fn create<P: AsRef<Path>>(path: P, config: &SledConfig) -> Result<Self> {
        if config.temporary {
            return Self::open_with(None, config);
        }

        let path = path.as_ref();
        if version_file(path).exists() {
            return Err(StorageError::AlreadyExists(path.to_path_buf()));
        }

        let storage = Self::open_with(Some(path), config)
            .map_err(|e| StorageError::CreateFailed(format!("{}: {}", path.display(), e)))?;
        check_version(SLED_DB_TYPE, path, true)?;

        info!(path = %path.display(), "created sled storage");
        Ok(storage)
    }

    /// Open an existing store at `path`.
    ///
    /// The version stamp is checked before the engine is opened.
    pub fn open<P: AsRef<Path>>(path: P, config: &SledConfig) -> Result<Self> {
        if config.temporary {
            return Self::open_with(None, config);
        }

        let path = path.as_ref();
        check_version(SLED_DB_TYPE, path, false)?;

        let storage = Self::open_with(Some(path), config)
            .map_err(|e| StorageError::OpenFailed(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), "opened sled storage");
        Ok(storage)
    }

    /// Open an in-memory store (for testing).
    pub fn open_temporary() -> Result<Self> {
        Self::open_with(None, &SledConfig::temporary())
    }

    fn open_with(path: Option<&Path>, config: &SledConfig) -> Result<Self> {
        let mut sled_config = sled::Config::new()
            .cache_capacity(config.cache_capacity)
            .flush_every_ms(config.flush_every_ms)
            .temporary(config.temporary);
        if let Some(path) = path {
            sled_config = sled_config.path(path);
        }

        Ok(Self {
            db: sled_config.open()?,
            handle: NEXT_HANDLE.fetch_add(1, Ordering::Relaxed),
            sync_on_write: config.sync_on_write,
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Storage for SledStorage {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.db
            .get(key)?
            .map(|v| v.to_vec())
            .ok_or(StorageError::NotFound)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }
        self.db.insert(key, value)?;
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }
        self.db.remove(key)?;
        Ok(())
    }

    /// Atomicity is provided by sled's `apply_batch`: the ops are collected
    /// into one `sled::Batch` and land together or not at all.
    fn write(&self, batch: &WriteBatch) -> Result<()> {
        batch.check_owner(self.handle)?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut sled_batch = sled::Batch::default();
        for op in batch.ops() {
            match op {
                BatchOp::Insert { key, value } => sled_batch.insert(key.as_slice(), value.as_slice()),
                BatchOp::Remove { key } => sled_batch.remove(key.as_slice()),
            }
        }
        self.db.apply_batch(sled_batch)?;

        if self.sync_on_write {
            self.db.flush()?;
        }
        debug!(ops = batch.len(), "applied write batch");
        Ok(())
    }

    fn new_batch(&self) -> WriteBatch {
        WriteBatch::for_owner(self.handle)
    }

    fn new_iterator(&self, range: &Range) -> Box<dyn KvIterator + '_> {
        Box::new(SledIterator::new(self.db.clone(), range.clone()))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.db.flush()?;
        debug!("closed sled storage");
        Ok(())
    }
}

/// Cursor over a key range of a sled tree.
struct SledIterator {
    db: Db,
    range: Range,
    inner: Option<sled::Iter>,
    current: Option<(IVec, IVec)>,
    error: Option<StorageError>,
    done: bool,
}

impl SledIterator {
    fn new(db: Db, range: Range) -> Self {
        Self {
            db,
            range,
            inner: None,
            current: None,
            error: None,
            done: false,
        }
    }

    /// Start a fresh scan at `max(from, range.start)`, or `None` if that
    /// already lies past the limit.
    fn scan_from(&self, from: &[u8]) -> Option<sled::Iter> {
        let start = from.max(self.range.start.as_slice());
        let upper = match &self.range.limit {
            Some(limit) if limit.as_slice() <= start => return None,
            Some(limit) => Bound::Excluded(limit.clone()),
            None => Bound::Unbounded,
        };
        Some(self.db.range::<Vec<u8>, _>((Bound::Included(start.to_vec()), upper)))
    }
}

impl KvIterator for SledIterator {
    fn seek(&mut self, key: &[u8]) -> bool {
        self.current = None;
        self.inner = self.scan_from(key);
        self.done = self.inner.is_none();
        self.next()
    }

    fn next(&mut self) -> bool {
        if self.done {
            return false;
        }
        if self.inner.is_none() {
            let start = self.range.start.clone();
            self.inner = self.scan_from(&start);
        }

        let item = self.inner.as_mut().and_then(|iter| iter.next());
        match item {
            Some(Ok(kv)) => {
                self.current = Some(kv);
                true
            }
            Some(Err(e)) => {
                self.error = Some(e.into());
                self.current = None;
                self.done = true;
                false
            }
            None => {
                self.current = None;
                self.done = true;
                false
            }
        }
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_ref())
    }

    fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_ref())
    }

    fn error(&self) -> Option<&StorageError> {
        self.error.as_ref()
    }

    fn take_error(&mut self) -> Option<StorageError> {
        self.error.take()
    }
}

/// Pick the [`SledConfig`] out of free-form driver arguments.
///
/// No argument means defaults; anything other than a `SledConfig` in the
/// first slot is rejected.
pub fn config_from_args(args: &[&dyn Any]) -> Result<SledConfig> {
    match args.first() {
        None => Ok(SledConfig::default()),
        Some(arg) => arg.downcast_ref::<SledConfig>().cloned().ok_or_else(|| {
            StorageError::InvalidArgument("sled driver expects a SledConfig argument".into())
        }),
    }
}

/// The sled driver entry for a [`StorageRegistry`](crate::StorageRegistry).
pub fn driver() -> StorageDriver {
    Driver::new(
        SLED_DB_TYPE,
        |path, args| Ok(Box::new(SledStorage::create(path, &config_from_args(args)?)?)),
        |path, args| Ok(Box::new(SledStorage::open(path, &config_from_args(args)?)?)),
    )
}
