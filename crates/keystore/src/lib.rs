//! Keystore records for walletdb.
//!
//! A keystore lives in buckets of the bucket DB: wallet-level records
//! (master key parameters, crypto keys, entropy, coin type, account rows)
//! under fixed names, per-account records (branch keys, child indexes) in
//! account buckets, and per-address public keys keyed by branch and index.
//! The functions in [`store`] read and write them inside whatever
//! transaction the caller holds.

pub mod codec;
pub mod error;
pub mod keys;
pub mod store;

pub use codec::{AccountRow, AccountType, HdAccountKey};
pub use error::{KeystoreError, Result};
pub use store::*;

/// Keystore format version written by this crate.
pub const KEYSTORE_VERSION: u8 = 1;
