//! Transactions and the helpers that scope them.

use crate::bucket::{Bucket, BucketMeta};
use crate::error::{DbError, Result};
use tracing::warn;

/// A bucketed database handle.
pub trait Db: Send + Sync {
    /// Begin a write transaction.
    ///
    /// Write transactions are serialized: this blocks while another one is
    /// open on the same handle.
    fn begin_tx(&self) -> Result<Box<dyn DbTransaction + '_>>;

    /// Begin a read transaction.
    ///
    /// Its reads see one committed state; commits made while it is open
    /// become visible only to later transactions.
    fn begin_read_tx(&self) -> Result<Box<dyn ReadTransaction + '_>>;

    /// Flush and release the handle. Open transactions borrow the handle,
    /// so they must all be finished first.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Read access to the bucket hierarchy.
///
/// A read transaction must be released with [`rollback`](Self::rollback)
/// (or by dropping it); it never changes anything.
pub trait ReadTransaction {
    /// Open top-level bucket `name`, or `None` if it does not exist.
    fn top_level_bucket(&self, name: &str) -> Result<Option<Box<dyn Bucket + '_>>>;

    /// Open the bucket described by `meta` directly, or `None` if it no
    /// longer exists.
    fn fetch_bucket(&self, meta: &BucketMeta) -> Result<Option<Box<dyn Bucket + '_>>>;

    /// Names of the top-level buckets.
    fn bucket_names(&self) -> Result<Vec<String>>;

    /// End the transaction, discarding anything it did.
    fn rollback(self: Box<Self>) -> Result<()>;
}

/// A read-write transaction.
///
/// Changes become visible to other transactions only on
/// [`commit`](Self::commit), all at once. Dropping the transaction without
/// committing rolls it back.
pub trait DbTransaction: ReadTransaction {
    /// Create top-level bucket `name`. Fails if it already exists.
    fn create_top_level_bucket(&self, name: &str) -> Result<Box<dyn Bucket + '_>>;

    /// Delete top-level bucket `name` and everything under it.
    fn delete_top_level_bucket(&self, name: &str) -> Result<()>;

    /// Make every change of the transaction durable, atomically.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Run `f` inside a read transaction that is always released afterwards.
pub fn view<D, T, E, F>(db: &D, f: F) -> std::result::Result<T, E>
where
    D: Db + ?Sized,
    F: FnOnce(&dyn ReadTransaction) -> std::result::Result<T, E>,
    E: From<DbError>,
{
    let tx = db.begin_read_tx()?;
    let result = f(tx.as_ref());
    if let Err(e) = tx.rollback() {
        warn!(error = %e, "failed to release read transaction");
    }
    result
}

/// Run `f` inside a write transaction.
///
/// If `f` fails the transaction is rolled back and the error returned;
/// otherwise the commit's own result is returned.
pub fn update<D, T, E, F>(db: &D, f: F) -> std::result::Result<T, E>
where
    D: Db + ?Sized,
    F: FnOnce(&dyn DbTransaction) -> std::result::Result<T, E>,
    E: From<DbError>,
{
    let tx = db.begin_tx()?;
    match f(tx.as_ref()) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "failed to roll back write transaction");
            }
            Err(e)
        }
    }
}
