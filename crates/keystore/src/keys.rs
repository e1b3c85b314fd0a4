//! Fixed record names inside a keystore bucket.
//!
//! These are part of the on-disk format and must not change.

pub const KEYSTORE_VERSION: &[u8] = b"kver";

pub const MASTER_KM_PUB_KEY: &[u8] = b"mkmpub";

pub const MASTER_PRIV_KEY: &[u8] = b"mpriv";
pub const MASTER_PUB_KEY: &[u8] = b"mpub";
pub const CRYPTO_PRIV_KEY: &[u8] = b"cpriv";
pub const CRYPTO_PUB_KEY: &[u8] = b"cpub";
pub const CRYPTO_ENTROPY_KEY: &[u8] = b"cent";

pub const ENTROPY_ENC: &[u8] = b"ent";

pub const MASTER_HD_PRIV: &[u8] = b"mhdpriv";
pub const MASTER_HD_PUB: &[u8] = b"mhdpub";

/// Highest account number allocated so far.
pub const ACCOUNT_USAGE: &[u8] = b"account";
pub const COIN_TYPE: &[u8] = b"coinType";
pub const REMARK: &[u8] = b"remark";

pub const EXTERNAL_BRANCH_PUB_KEY: &[u8] = b"exbPubKey";
pub const INTERNAL_BRANCH_PUB_KEY: &[u8] = b"inbPubKey";
pub const EXTERNAL_CHILD_NUM: &[u8] = b"exChildNum";
pub const INTERNAL_CHILD_NUM: &[u8] = b"inChildNum";

/// Every fixed record name. Other 4-byte keys in a keystore bucket are
/// account rows.
pub const FIXED_NAMES: &[&[u8]] = &[
    KEYSTORE_VERSION,
    MASTER_KM_PUB_KEY,
    MASTER_PRIV_KEY,
    MASTER_PUB_KEY,
    CRYPTO_PRIV_KEY,
    CRYPTO_PUB_KEY,
    CRYPTO_ENTROPY_KEY,
    ENTROPY_ENC,
    MASTER_HD_PRIV,
    MASTER_HD_PUB,
    ACCOUNT_USAGE,
    COIN_TYPE,
    REMARK,
    EXTERNAL_BRANCH_PUB_KEY,
    INTERNAL_BRANCH_PUB_KEY,
    EXTERNAL_CHILD_NUM,
    INTERNAL_CHILD_NUM,
];
