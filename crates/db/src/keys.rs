//! Layout of bucket records inside the flat store.
//!
//! Every bucket gets a numeric id; the root has id 0. Three key families
//! share the flat keyspace, told apart by their first byte:
//!
//! ```text
//! 0x00 "next_bucket_id"            -> u64 BE     id allocator
//! 0x01 parent_id(u64 BE) name      -> u64 BE     child bucket record
//! 0x02 bucket_id(u64 BE) user_key  -> value      bucket data
//! ```
//!
//! Fixed-width ids keep one bucket's keys from ever sharing a prefix with
//! another bucket's.

use crate::error::{DbError, Result};

const TAG_META: u8 = 0x00;
const TAG_BUCKET: u8 = 0x01;
const TAG_DATA: u8 = 0x02;

/// Id of the implicit root that owns the top-level buckets.
pub const ROOT_ID: u64 = 0;

/// First id handed out to a real bucket.
pub const FIRST_BUCKET_ID: u64 = 1;

pub fn next_id_key() -> Vec<u8> {
    let mut key = vec![TAG_META];
    key.extend_from_slice(b"next_bucket_id");
    key
}

/// Key of the record naming child `name` of bucket `parent`.
pub fn bucket_key(parent: u64, name: &str) -> Vec<u8> {
    let mut key = children_prefix(parent);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Prefix shared by every child record of bucket `parent`.
pub fn children_prefix(parent: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(TAG_BUCKET);
    key.extend_from_slice(&parent.to_be_bytes());
    key
}

/// Key of user key `key` inside bucket `id`.
pub fn data_key(id: u64, key: &[u8]) -> Vec<u8> {
    let mut out = data_prefix(id);
    out.extend_from_slice(key);
    out
}

/// Prefix shared by every data key of bucket `id`.
pub fn data_prefix(id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(TAG_DATA);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub fn encode_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

pub fn decode_id(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DbError::Corrupted(format!("bucket id of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}
