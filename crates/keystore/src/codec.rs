//! Binary layouts of keystore records.
//!
//! All integers are little-endian. Variable-size blobs carry a 4-byte
//! length immediately before them.
//!
//! ```text
//! account row:     <acct_type: u8><raw_len: u32><raw_data>
//! HD account key:  <pub_len: u32><pub_enc><priv_len: u32><priv_enc>
//! address key id:  <branch: u32><index: u32>
//! ```

use crate::error::{KeystoreError, Result};

/// Size of the fixed part of an account row.
pub const ACCOUNT_ROW_HEADER_LEN: usize = 5;

/// Size of the two length prefixes of an HD account key.
pub const HD_ACCOUNT_KEY_HEADER_LEN: usize = 8;

/// Size of a per-address public key record id.
pub const ADDRESS_KEY_LEN: usize = 8;

/// Account kinds an account row can hold. Tags are stable on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccountType {
    /// BIP44-style hierarchical deterministic account.
    Hd = 0,
}

impl TryFrom<u8> for AccountType {
    type Error = KeystoreError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(AccountType::Hd),
            other => Err(KeystoreError::UnsupportedAccountType(other)),
        }
    }
}

/// The common envelope of every stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    /// Raw type tag, kept as stored so unknown kinds can be reported.
    pub acct_type: u8,
    pub raw_data: Vec<u8>,
}

impl AccountRow {
    pub fn new(acct_type: AccountType, raw_data: Vec<u8>) -> Self {
        Self {
            acct_type: acct_type as u8,
            raw_data,
        }
    }

    pub fn account_type(&self) -> Result<AccountType> {
        AccountType::try_from(self.acct_type)
    }
}

/// Encrypted key pair of an HD account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdAccountKey {
    pub pub_key_encrypted: Vec<u8>,
    pub priv_key_encrypted: Vec<u8>,
}

pub fn encode_u32(n: u32) -> [u8; 4] {
    n.to_le_bytes()
}

/// Decode a stored 4-byte counter. `record` names it in the error.
pub fn decode_u32(record: &'static str, key: &[u8], bytes: &[u8]) -> Result<u32> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| KeystoreError::malformed(record, key))?;
    Ok(u32::from_le_bytes(arr))
}

/// Length prefix of a blob of `len` bytes.
fn blob_len(record: &'static str, len: usize) -> Result<[u8; 4]> {
    u32::try_from(len)
        .map(encode_u32)
        .map_err(|_| KeystoreError::BlobTooLarge { record, len })
}

fn put_blob(buf: &mut Vec<u8>, record: &'static str, blob: &[u8]) -> Result<()> {
    buf.extend_from_slice(&blob_len(record, blob.len())?);
    buf.extend_from_slice(blob);
    Ok(())
}

/// Read one length-prefixed blob at `offset`, returning it and the offset
/// just past it.
fn take_blob(data: &[u8], offset: usize) -> Option<(&[u8], usize)> {
    let len_end = offset.checked_add(4)?;
    let len_bytes: [u8; 4] = data.get(offset..len_end)?.try_into().ok()?;
    let end = len_end.checked_add(u32::from_le_bytes(len_bytes) as usize)?;
    Some((data.get(len_end..end)?, end))
}

/// Encode an account row. Fails if the raw data does not fit a `u32` length.
pub fn serialize_account_row(row: &AccountRow) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(ACCOUNT_ROW_HEADER_LEN + row.raw_data.len());
    buf.push(row.acct_type);
    put_blob(&mut buf, "account", &row.raw_data)?;
    Ok(buf)
}

/// Decode an account row stored under `account_id`.
///
/// Rows shorter than the header, or whose declared length runs past the
/// end of the record, are malformed.
pub fn deserialize_account_row(account_id: &[u8], data: &[u8]) -> Result<AccountRow> {
    if data.len() < ACCOUNT_ROW_HEADER_LEN {
        return Err(KeystoreError::malformed("account", account_id));
    }
    let (raw, _) = take_blob(data, 1).ok_or_else(|| KeystoreError::malformed("account", account_id))?;
    Ok(AccountRow {
        acct_type: data[0],
        raw_data: raw.to_vec(),
    })
}

pub fn serialize_hd_account_key(
    pub_key_encrypted: &[u8],
    priv_key_encrypted: &[u8],
) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(
        HD_ACCOUNT_KEY_HEADER_LEN + pub_key_encrypted.len() + priv_key_encrypted.len(),
    );
    put_blob(&mut buf, "HD account public key", pub_key_encrypted)?;
    put_blob(&mut buf, "HD account private key", priv_key_encrypted)?;
    Ok(buf)
}

pub fn deserialize_hd_account_key(account_id: &[u8], raw: &[u8]) -> Result<HdAccountKey> {
    let malformed = || KeystoreError::malformed("HD account", account_id);
    if raw.len() < HD_ACCOUNT_KEY_HEADER_LEN {
        return Err(malformed());
    }
    let (pub_key, offset) = take_blob(raw, 0).ok_or_else(malformed)?;
    let (priv_key, _) = take_blob(raw, offset).ok_or_else(malformed)?;
    Ok(HdAccountKey {
        pub_key_encrypted: pub_key.to_vec(),
        priv_key_encrypted: priv_key.to_vec(),
    })
}

/// Record id of the encrypted public key at `branch`/`index`.
pub fn address_key(branch: u32, index: u32) -> [u8; ADDRESS_KEY_LEN] {
    let mut key = [0u8; ADDRESS_KEY_LEN];
    key[..4].copy_from_slice(&encode_u32(branch));
    key[4..].copy_from_slice(&encode_u32(index));
    key
}

/// Split a per-address record id back into `(branch, index)`.
pub fn parse_address_key(key: &[u8]) -> Result<(u32, u32)> {
    if key.len() != ADDRESS_KEY_LEN {
        return Err(KeystoreError::malformed("address public key", key));
    }
    let branch = decode_u32("address public key", key, &key[..4])?;
    let index = decode_u32("address public key", key, &key[4..])?;
    Ok((branch, index))
}
