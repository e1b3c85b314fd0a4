//! Flat key-value storage layer for walletdb.
//!
//! This crate provides the single-namespace substrate the bucket DB and
//! simpler consumers build on:
//! - Half-open key ranges and prefix ranges
//! - The [`Storage`] contract (get/put/has/delete, atomic batches, ordered cursors)
//! - Driver registries mapping a type name to create/open constructors
//! - The on-disk version stamp that gates opening an existing store
//! - A sled-backed driver
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Bucket DB / flat-store consumers            │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                 StorageRegistry ("sled", ...)            │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐  │
//! │  │ Storage     │  │ WriteBatch  │  │ KvIterator      │  │
//! │  │  - get/put  │  │  - put      │  │  - seek/next    │  │
//! │  │  - has/del  │  │  - delete   │  │  - key/value    │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │          sled Database  +  .ver version stamp            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use walletdb_storage::{bytes_prefix, default_registry, SledConfig};
//!
//! let registry = default_registry();
//! let config = SledConfig::default();
//! let storage = registry.create("sled", "./wallet_data", &[&config]).unwrap();
//!
//! let mut batch = storage.new_batch();
//! batch.put(b"acct:1", b"alice").unwrap();
//! batch.put(b"acct:2", b"bob").unwrap();
//! storage.write(&batch).unwrap();
//!
//! let mut iter = storage.new_iterator(&bytes_prefix(b"acct:"));
//! while iter.next() {
//!     println!("{:?} => {:?}", iter.key(), iter.value());
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod iterator;
pub mod range;
pub mod registry;
pub mod sled_storage;
pub mod storage;
pub mod version;

// Re-export commonly used types
pub use batch::{BatchOp, WriteBatch};
pub use config::SledConfig;
pub use error::{Result, StorageError, UnknownDbType};
pub use iterator::KvIterator;
pub use range::{bytes_prefix, Range};
pub use registry::{Constructor, Driver, Registry};
pub use sled_storage::{SledStorage, SLED_DB_TYPE};
pub use storage::Storage;
pub use version::{check_version, read_version, StorageVersion, CURRENT_STORAGE_VERSION};

/// Size units for cache and buffer settings.
pub const KIB: u64 = 1024;
pub const MIB: u64 = KIB * 1024;
pub const GIB: u64 = MIB * 1024;

/// A flat storage driver entry.
pub type StorageDriver = Driver<dyn Storage, StorageError>;

/// Registry of flat storage drivers.
pub type StorageRegistry = Registry<dyn Storage, StorageError>;

/// A registry with every built-in driver registered.
pub fn default_registry() -> StorageRegistry {
    let mut registry = StorageRegistry::new();
    registry.register(sled_storage::driver());
    registry
}
