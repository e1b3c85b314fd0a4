//! Bucket contract and descriptors.

use crate::error::{DbError, Result};
use crate::keys::ROOT_ID;
use walletdb_storage::{KvIterator, Range};

/// Longest bucket name accepted, in bytes.
pub const MAX_BUCKET_NAME_LEN: usize = 255;

/// A key/value pair returned by prefix scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Describes where a bucket lives, so it can be fetched again without
/// walking the hierarchy from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketMeta {
    path: Vec<String>,
    id: u64,
    parent: u64,
}

impl BucketMeta {
    pub(crate) fn new(path: Vec<String>, id: u64, parent: u64) -> Self {
        Self { path, id, parent }
    }

    /// The implicit root owning the top-level buckets.
    pub(crate) fn root() -> Self {
        Self::new(Vec::new(), ROOT_ID, ROOT_ID)
    }

    /// Names from the DB root down to this bucket.
    pub fn paths(&self) -> &[String] {
        &self.path
    }

    /// This bucket's own name.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    /// Number of names in the path; top-level buckets have depth 1.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn parent(&self) -> u64 {
        self.parent
    }

    /// Descriptor of child `name` with id `id`.
    pub(crate) fn child(&self, name: &str, id: u64) -> Self {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Self::new(path, id, self.id)
    }
}

/// A named, ordered key space that can hold nested buckets.
///
/// Buckets are handles borrowed from a transaction; mutations through a
/// bucket obtained from a read transaction fail with
/// [`DbError::WriteNotAllowed`].
pub trait Bucket {
    /// Create child bucket `name`. Fails if it already exists.
    fn new_bucket(&self, name: &str) -> Result<Box<dyn Bucket + '_>>;

    /// Open child bucket `name`, or `None` if there is no such child.
    fn bucket(&self, name: &str) -> Result<Option<Box<dyn Bucket + '_>>>;

    /// Names of the immediate children, in byte order.
    fn bucket_names(&self) -> Result<Vec<String>>;

    /// Delete child bucket `name` together with every key and bucket under it.
    fn delete_bucket(&self, name: &str) -> Result<()>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Value stored under `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Remove every key of this bucket. Child buckets are kept.
    fn clear(&self) -> Result<()>;

    /// Every entry whose key starts with `prefix`, in key order.
    fn get_by_prefix(&self, prefix: &[u8]) -> Result<Vec<Entry>>;

    /// Descriptor for fetching this bucket again.
    fn meta(&self) -> &BucketMeta;

    /// Cursor over this bucket's keys within `range` (all keys if `None`).
    fn new_iterator(&self, range: Option<&Range>) -> Box<dyn KvIterator + '_>;
}

/// Check that `name` may be used as a bucket name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_BUCKET_NAME_LEN {
        return Err(DbError::InvalidBucketName(name.to_string()));
    }
    Ok(())
}
