//! Bucketed DB drivers.

use crate::error::DbError;
use crate::kv::BucketDb;
use crate::tx::Db;
use walletdb_storage::sled_storage::config_from_args;
use walletdb_storage::{Driver, Registry, SledStorage, SLED_DB_TYPE};

/// A bucketed DB driver entry.
pub type DbDriver = Driver<dyn Db, DbError>;

/// Registry of bucketed DB drivers.
pub type DbRegistry = Registry<dyn Db, DbError>;

/// Bucket DB on a sled store. Takes an optional
/// [`SledConfig`](walletdb_storage::SledConfig) as its first argument.
pub fn sled_driver() -> DbDriver {
    Driver::new(
        SLED_DB_TYPE,
        |path, args| {
            let storage = SledStorage::create(path, &config_from_args(args)?)?;
            Ok(Box::new(BucketDb::new(Box::new(storage))))
        },
        |path, args| {
            let storage = SledStorage::open(path, &config_from_args(args)?)?;
            Ok(Box::new(BucketDb::new(Box::new(storage))))
        },
    )
}

/// A registry with every built-in DB driver registered.
pub fn default_registry() -> DbRegistry {
    let mut registry = DbRegistry::new();
    registry.register(sled_driver());
    registry
}
