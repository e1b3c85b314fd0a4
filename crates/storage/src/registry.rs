//! Driver registries.
//!
//! A registry maps a storage type identifier to a pair of constructors.
//! The same generic table serves flat [`Storage`](crate::Storage) drivers
//! here and bucketed DB drivers in `walletdb-db`.
//!
//! Registries are plain values: build one at startup, register drivers on
//! a single thread, then share it read-only.

use crate::error::UnknownDbType;
use std::any::Any;
use std::path::Path;
use tracing::debug;

/// A driver constructor: storage path plus free-form positional arguments.
///
/// The registry never inspects the arguments; each driver downcasts the
/// ones it understands.
pub type Constructor<H, E> = fn(&Path, &[&dyn Any]) -> Result<Box<H>, E>;

/// A named pair of constructors.
pub struct Driver<H: ?Sized, E> {
    /// Type identifier the driver is registered under.
    pub db_type: String,
    /// Initialize a new store at a path.
    pub create: Constructor<H, E>,
    /// Open an existing store at a path.
    pub open: Constructor<H, E>,
}

impl<H: ?Sized, E> Driver<H, E> {
    pub fn new(
        db_type: impl Into<String>,
        create: Constructor<H, E>,
        open: Constructor<H, E>,
    ) -> Self {
        Self {
            db_type: db_type.into(),
            create,
            open,
        }
    }
}

/// Append-only table of drivers, in registration order.
pub struct Registry<H: ?Sized, E> {
    drivers: Vec<Driver<H, E>>,
}

impl<H: ?Sized, E> Default for Registry<H, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized, E> Registry<H, E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            drivers: Vec::new(),
        }
    }

    /// Register a driver.
    ///
    /// The first registration of a type wins; later ones with the same type
    /// are ignored. Returns whether the driver was added.
    pub fn register(&mut self, driver: Driver<H, E>) -> bool {
        if self.driver(&driver.db_type).is_some() {
            debug!(db_type = %driver.db_type, "driver already registered, ignoring");
            return false;
        }
        debug!(db_type = %driver.db_type, "registered driver");
        self.drivers.push(driver);
        true
    }

    /// Registered type identifiers, in registration order.
    pub fn registered_types(&self) -> Vec<&str> {
        self.drivers.iter().map(|d| d.db_type.as_str()).collect()
    }

    /// Look up a driver by type.
    pub fn driver(&self, db_type: &str) -> Option<&Driver<H, E>> {
        self.drivers.iter().find(|d| d.db_type == db_type)
    }

    /// Create a new store through the driver registered as `db_type`.
    ///
    /// The driver's result is returned as is.
    pub fn create<P: AsRef<Path>>(
        &self,
        db_type: &str,
        path: P,
        args: &[&dyn Any],
    ) -> Result<Box<H>, E>
    where
        E: From<UnknownDbType>,
    {
        let driver = self
            .driver(db_type)
            .ok_or_else(|| UnknownDbType(db_type.to_string()))?;
        (driver.create)(path.as_ref(), args)
    }

    /// Open an existing store through the driver registered as `db_type`.
    pub fn open<P: AsRef<Path>>(
        &self,
        db_type: &str,
        path: P,
        args: &[&dyn Any],
    ) -> Result<Box<H>, E>
    where
        E: From<UnknownDbType>,
    {
        let driver = self
            .driver(db_type)
            .ok_or_else(|| UnknownDbType(db_type.to_string()))?;
        (driver.open)(path.as_ref(), args)
    }
}
