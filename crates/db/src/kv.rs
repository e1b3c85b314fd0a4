//! Bucket DB engine over any flat [`Storage`].
//!
//! Transactions stage their writes in an ordered overlay and read through
//! it, so a transaction always sees its own changes. Commit turns the
//! overlay into one [`WriteBatch`](walletdb_storage::WriteBatch), which the
//! storage applies atomically. Write transactions are serialized by a
//! per-handle lock held until commit or rollback. Read transactions hold a
//! shared commit gate for their lifetime and commits take it exclusively,
//! so a reader never observes part of a commit.

use crate::bucket::{validate_name, Bucket, BucketMeta, Entry};
use crate::error::{DbError, Result};
use crate::iter::EntryIterator;
use crate::keys::{self, FIRST_BUCKET_ID};
use crate::tx::{Db, DbTransaction, ReadTransaction};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tracing::debug;
use walletdb_storage::{bytes_prefix, KvIterator, Range, Storage};

/// A bucketed database layered over a flat store.
pub struct BucketDb {
    storage: Box<dyn Storage>,
    writer: Mutex<()>,
    /// Shared by open readers, exclusive while a batch is applied.
    commit_gate: RwLock<()>,
}

impl BucketDb {
    /// Wrap an opened flat store.
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            writer: Mutex::new(()),
            commit_gate: RwLock::new(()),
        }
    }

    /// The underlying flat store.
    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }
}

impl Db for BucketDb {
    fn begin_tx(&self) -> Result<Box<dyn DbTransaction + '_>> {
        let guard = self
            .writer
            .lock()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))?;
        Ok(Box::new(KvWriteTx {
            core: TxCore::new(self.storage.as_ref(), true),
            finished: false,
            commit_gate: &self.commit_gate,
            _writer: guard,
        }))
    }

    fn begin_read_tx(&self) -> Result<Box<dyn ReadTransaction + '_>> {
        let snapshot = self
            .commit_gate
            .read()
            .map_err(|e| DbError::LockPoisoned(e.to_string()))?;
        Ok(Box::new(KvReadTx {
            core: TxCore::new(self.storage.as_ref(), false),
            _snapshot: snapshot,
        }))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.storage.close()?;
        debug!("closed bucket db");
        Ok(())
    }
}

/// State shared by read and write transactions.
struct TxCore<'db> {
    storage: &'db dyn Storage,
    /// Staged writes; `None` marks a deletion.
    pending: RefCell<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
    writable: bool,
}

impl<'db> TxCore<'db> {
    fn new(storage: &'db dyn Storage, writable: bool) -> Self {
        Self {
            storage,
            pending: RefCell::new(BTreeMap::new()),
            writable,
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(DbError::WriteNotAllowed)
        }
    }

    fn stage(&self, key: Vec<u8>, value: Option<Vec<u8>>) {
        self.pending.borrow_mut().insert(key, value);
    }

    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(staged) = self.pending.borrow().get(key) {
            return Ok(staged.clone());
        }
        match self.storage.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every live entry in `range`, staged writes applied on top.
    fn scan(&self, range: &Range) -> walletdb_storage::Result<Vec<Entry>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let mut merged = BTreeMap::new();
        {
            let mut iter = self.storage.new_iterator(range);
            while iter.next() {
                if let (Some(key), Some(value)) = (iter.key(), iter.value()) {
                    merged.insert(key.to_vec(), value.to_vec());
                }
            }
            if let Some(err) = iter.take_error() {
                return Err(err);
            }
        }

        for (key, staged) in self.pending.borrow().range::<[u8], _>(range.bounds()) {
            match staged {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged
            .into_iter()
            .map(|(key, value)| Entry { key, value })
            .collect())
    }

    fn next_bucket_id(&self) -> Result<u64> {
        let key = keys::next_id_key();
        let id = match self.read(&key)? {
            Some(bytes) => keys::decode_id(&bytes)?,
            None => FIRST_BUCKET_ID,
        };
        self.stage(key, Some(keys::encode_id(id + 1).to_vec()));
        Ok(id)
    }

    fn child_meta(&self, parent: &BucketMeta, name: &str) -> Result<Option<BucketMeta>> {
        validate_name(name)?;
        match self.read(&keys::bucket_key(parent.id(), name))? {
            Some(bytes) => Ok(Some(parent.child(name, keys::decode_id(&bytes)?))),
            None => Ok(None),
        }
    }

    fn child_names(&self, parent: &BucketMeta) -> Result<Vec<String>> {
        let prefix = keys::children_prefix(parent.id());
        self.scan(&bytes_prefix(&prefix))?
            .into_iter()
            .map(|entry| {
                String::from_utf8(entry.key[prefix.len()..].to_vec())
                    .map_err(|_| DbError::Corrupted("bucket name is not valid UTF-8".into()))
            })
            .collect()
    }

    fn create_child(&self, parent: &BucketMeta, name: &str) -> Result<BucketMeta> {
        self.ensure_writable()?;
        if self.child_meta(parent, name)?.is_some() {
            return Err(DbError::BucketExists(display_path(parent, name)));
        }
        let id = self.next_bucket_id()?;
        self.stage(
            keys::bucket_key(parent.id(), name),
            Some(keys::encode_id(id).to_vec()),
        );
        debug!(path = %display_path(parent, name), id, "created bucket");
        Ok(parent.child(name, id))
    }

    fn delete_child(&self, parent: &BucketMeta, name: &str) -> Result<()> {
        self.ensure_writable()?;
        let child = self
            .child_meta(parent, name)?
            .ok_or_else(|| DbError::BucketNotFound(display_path(parent, name)))?;
        self.delete_tree(child.id())?;
        self.stage(keys::bucket_key(parent.id(), name), None);
        debug!(path = %display_path(parent, name), id = child.id(), "deleted bucket");
        Ok(())
    }

    /// Stage deletion of every record below bucket `id`.
    fn delete_tree(&self, id: u64) -> Result<()> {
        for entry in self.scan(&bytes_prefix(&keys::children_prefix(id)))? {
            self.delete_tree(keys::decode_id(&entry.value)?)?;
            self.stage(entry.key, None);
        }
        self.clear_data(id)
    }

    fn clear_data(&self, id: u64) -> Result<()> {
        for entry in self.scan(&bytes_prefix(&keys::data_prefix(id)))? {
            self.stage(entry.key, None);
        }
        Ok(())
    }

    fn open_top_level(&self, name: &str) -> Result<Option<Box<dyn Bucket + '_>>> {
        let meta = self.child_meta(&BucketMeta::root(), name)?;
        Ok(meta.map(|meta| self.bucket(meta)))
    }

    fn fetch(&self, meta: &BucketMeta) -> Result<Option<Box<dyn Bucket + '_>>> {
        if meta.depth() == 0 {
            return Err(DbError::IllegalBucketPath(meta.paths().to_vec()));
        }
        let Some(bytes) = self.read(&keys::bucket_key(meta.parent(), meta.name()))? else {
            return Ok(None);
        };
        if keys::decode_id(&bytes)? != meta.id() {
            return Ok(None);
        }
        Ok(Some(self.bucket(meta.clone())))
    }

    fn bucket(&self, meta: BucketMeta) -> Box<dyn Bucket + '_> {
        Box::new(KvBucket { core: self, meta })
    }
}

fn display_path(parent: &BucketMeta, name: &str) -> String {
    let mut path = parent.paths().to_vec();
    path.push(name.to_string());
    path.join("/")
}

/// Translate a bucket-relative range into the flat keyspace.
fn bucket_range(id: u64, range: &Range) -> Range {
    let prefix = keys::data_prefix(id);
    let limit = match &range.limit {
        Some(limit) => Some(keys::data_key(id, limit)),
        None => bytes_prefix(&prefix).limit,
    };
    Range::new(keys::data_key(id, &range.start), limit)
}

struct KvBucket<'a> {
    core: &'a TxCore<'a>,
    meta: BucketMeta,
}

impl KvBucket<'_> {
    fn scan(&self, range: &Range) -> walletdb_storage::Result<Vec<Entry>> {
        let strip = keys::data_prefix(self.meta.id()).len();
        let entries = self.core.scan(&bucket_range(self.meta.id(), range))?;
        Ok(entries
            .into_iter()
            .map(|Entry { key, value }| Entry {
                key: key[strip..].to_vec(),
                value,
            })
            .collect())
    }
}

fn check_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(DbError::IllegalKey);
    }
    Ok(())
}

impl Bucket for KvBucket<'_> {
    fn new_bucket(&self, name: &str) -> Result<Box<dyn Bucket + '_>> {
        let meta = self.core.create_child(&self.meta, name)?;
        Ok(self.core.bucket(meta))
    }

    fn bucket(&self, name: &str) -> Result<Option<Box<dyn Bucket + '_>>> {
        let meta = self.core.child_meta(&self.meta, name)?;
        Ok(meta.map(|meta| self.core.bucket(meta)))
    }

    fn bucket_names(&self) -> Result<Vec<String>> {
        self.core.child_names(&self.meta)
    }

    fn delete_bucket(&self, name: &str) -> Result<()> {
        self.core.delete_child(&self.meta, name)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.core.ensure_writable()?;
        check_key(key)?;
        self.core
            .stage(keys::data_key(self.meta.id(), key), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.core.ensure_writable()?;
        check_key(key)?;
        self.core.stage(keys::data_key(self.meta.id(), key), None);
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        check_key(key)?;
        self.core.read(&keys::data_key(self.meta.id(), key))
    }

    fn clear(&self) -> Result<()> {
        self.core.ensure_writable()?;
        self.core.clear_data(self.meta.id())
    }

    fn get_by_prefix(&self, prefix: &[u8]) -> Result<Vec<Entry>> {
        Ok(self.scan(&bytes_prefix(prefix))?)
    }

    fn meta(&self) -> &BucketMeta {
        &self.meta
    }

    fn new_iterator(&self, range: Option<&Range>) -> Box<dyn KvIterator + '_> {
        let range = range.cloned().unwrap_or_default();
        match self.scan(&range) {
            Ok(entries) => Box::new(EntryIterator::new(entries)),
            Err(e) => Box::new(EntryIterator::failed(e)),
        }
    }
}

struct KvReadTx<'db> {
    core: TxCore<'db>,
    _snapshot: RwLockReadGuard<'db, ()>,
}

impl ReadTransaction for KvReadTx<'_> {
    fn top_level_bucket(&self, name: &str) -> Result<Option<Box<dyn Bucket + '_>>> {
        self.core.open_top_level(name)
    }

    fn fetch_bucket(&self, meta: &BucketMeta) -> Result<Option<Box<dyn Bucket + '_>>> {
        self.core.fetch(meta)
    }

    fn bucket_names(&self) -> Result<Vec<String>> {
        self.core.child_names(&BucketMeta::root())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct KvWriteTx<'db> {
    core: TxCore<'db>,
    finished: bool,
    commit_gate: &'db RwLock<()>,
    _writer: MutexGuard<'db, ()>,
}

impl ReadTransaction for KvWriteTx<'_> {
    fn top_level_bucket(&self, name: &str) -> Result<Option<Box<dyn Bucket + '_>>> {
        self.core.open_top_level(name)
    }

    fn fetch_bucket(&self, meta: &BucketMeta) -> Result<Option<Box<dyn Bucket + '_>>> {
        self.core.fetch(meta)
    }

    fn bucket_names(&self) -> Result<Vec<String>> {
        self.core.child_names(&BucketMeta::root())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        let discarded = std::mem::take(self.core.pending.get_mut()).len();
        self.finished = true;
        debug!(discarded, "rolled back write transaction");
        Ok(())
    }
}

impl DbTransaction for KvWriteTx<'_> {
    fn create_top_level_bucket(&self, name: &str) -> Result<Box<dyn Bucket + '_>> {
        let meta = self.core.create_child(&BucketMeta::root(), name)?;
        Ok(self.core.bucket(meta))
    }

    fn delete_top_level_bucket(&self, name: &str) -> Result<()> {
        self.core.delete_child(&BucketMeta::root(), name)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.finished = true;
        let pending = std::mem::take(self.core.pending.get_mut());
        if pending.is_empty() {
            return Ok(());
        }

        let mut batch = self.core.storage.new_batch();
        for (key, staged) in &pending {
            match staged {
                Some(value) => batch.put(key, value)?,
                None => batch.delete(key)?,
            }
        }
        {
            let _gate = self
                .commit_gate
                .write()
                .map_err(|e| DbError::LockPoisoned(e.to_string()))?;
            self.core.storage.write(&batch)?;
        }
        debug!(ops = batch.len(), "committed write transaction");
        Ok(())
    }
}

impl Drop for KvWriteTx<'_> {
    fn drop(&mut self) {
        let discarded = self.core.pending.get_mut().len();
        if !self.finished && discarded > 0 {
            debug!(discarded, "write transaction dropped without commit, rolling back");
        }
    }
}
