//! Bucketed transactional database for walletdb.
//!
//! Buckets are named, nested key spaces. All access goes through
//! transactions: read transactions for lookups and scans, write
//! transactions for changes that become visible all at once on commit.
//! [`view`] and [`update`] scope a transaction to a closure and always
//! finish it, whichever way the closure exits.
//!
//! # Example
//!
//! ```rust,no_run
//! use walletdb_db::{default_registry, update, view, DbError};
//! use walletdb_storage::SledConfig;
//!
//! let db = default_registry()
//!     .create("sled", "./wallet_db", &[&SledConfig::default()])
//!     .unwrap();
//!
//! update(db.as_ref(), |tx| {
//!     let wallet = tx.create_top_level_bucket("wallet")?;
//!     let account = wallet.new_bucket("account-0")?;
//!     account.put(b"name", b"savings")?;
//!     Ok::<_, DbError>(())
//! })
//! .unwrap();
//!
//! let name = view(db.as_ref(), |tx| {
//!     let wallet = tx.top_level_bucket("wallet")?.ok_or(DbError::BucketNotFound("wallet".into()))?;
//!     let account = wallet.bucket("account-0")?.ok_or(DbError::BucketNotFound("account-0".into()))?;
//!     account.get(b"name")
//! })
//! .unwrap();
//! assert_eq!(name.as_deref(), Some(&b"savings"[..]));
//! ```

pub mod bucket;
pub mod drivers;
pub mod error;
pub mod iter;
pub mod keys;
pub mod kv;
pub mod tx;

pub use bucket::{validate_name, Bucket, BucketMeta, Entry, MAX_BUCKET_NAME_LEN};
pub use drivers::{default_registry, sled_driver, DbDriver, DbRegistry};
pub use error::{DbError, Result};
pub use iter::EntryIterator;
pub use kv::BucketDb;
pub use tx::{update, view, Db, DbTransaction, ReadTransaction};
