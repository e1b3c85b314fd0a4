//! Keystore accessors over a [`Bucket`].
//!
//! Each record has a `put_*`/`fetch_*` pair. Writers skip fields passed as
//! `None`; readers fail with [`KeystoreError::MissingField`] when a
//! mandatory record is absent and return `None` for optional ones.

use crate::codec::{
    self, address_key, decode_u32, encode_u32, parse_address_key, AccountRow, AccountType,
    HdAccountKey,
};
use crate::error::{KeystoreError, Result};
use crate::keys;
use tracing::debug;
use walletdb_db::Bucket;

/// Derivation branch of an HD account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Receiving addresses.
    External,
    /// Change addresses.
    Internal,
}

impl Branch {
    fn child_num_key(self) -> &'static [u8] {
        match self {
            Branch::External => keys::EXTERNAL_CHILD_NUM,
            Branch::Internal => keys::INTERNAL_CHILD_NUM,
        }
    }

    fn child_num_record(self) -> &'static str {
        match self {
            Branch::External => "external branch child number",
            Branch::Internal => "internal branch child number",
        }
    }
}

/// Master key derivation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyParams {
    pub pub_params: Vec<u8>,
    /// Absent in watching-only keystores.
    pub priv_params: Option<Vec<u8>>,
}

/// Encrypted crypto keys protecting the account keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoKeys {
    pub pub_key: Vec<u8>,
    pub priv_key: Option<Vec<u8>>,
    pub entropy_key: Option<Vec<u8>>,
}

/// Encrypted master HD key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterHdKeys {
    pub pub_key: Vec<u8>,
    pub priv_key: Option<Vec<u8>>,
}

/// Encrypted branch public keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPubKeys {
    pub internal: Vec<u8>,
    pub external: Vec<u8>,
}

/// Next unused child index of each branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildNums {
    pub internal: u32,
    pub external: u32,
}

/// One per-address encrypted public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPubKey {
    pub branch: u32,
    pub index: u32,
    pub pub_key_enc: Vec<u8>,
}

/// A decoded account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountInfo {
    Hd(HdAccountKey),
}

fn store(b: &dyn Bucket, key: &[u8], value: &[u8], record: &'static str) -> Result<()> {
    b.put(key, value)
        .map_err(|source| KeystoreError::Store { record, source })
}

fn required(b: &dyn Bucket, key: &[u8], record: &'static str) -> Result<Vec<u8>> {
    b.get(key)?.ok_or(KeystoreError::MissingField(record))
}

fn required_u32(b: &dyn Bucket, key: &[u8], record: &'static str) -> Result<u32> {
    decode_u32(record, key, &required(b, key, record)?)
}

/// Store the master key derivation parameters given as `Some`.
pub fn put_master_key_params(
    b: &dyn Bucket,
    pub_params: Option<&[u8]>,
    priv_params: Option<&[u8]>,
) -> Result<()> {
    if let Some(priv_params) = priv_params {
        store(b, keys::MASTER_PRIV_KEY, priv_params, "master private key parameters")?;
    }
    if let Some(pub_params) = pub_params {
        store(b, keys::MASTER_PUB_KEY, pub_params, "master public key parameters")?;
    }
    Ok(())
}

/// Master key parameters; the public half is required.
pub fn fetch_master_key_params(b: &dyn Bucket) -> Result<MasterKeyParams> {
    Ok(MasterKeyParams {
        pub_params: required(b, keys::MASTER_PUB_KEY, "master public key parameters")?,
        priv_params: b.get(keys::MASTER_PRIV_KEY)?,
    })
}

/// Store the key manager's master public key.
pub fn put_master_km_pub_key(b: &dyn Bucket, pub_key: &[u8]) -> Result<()> {
    store(b, keys::MASTER_KM_PUB_KEY, pub_key, "master key manager public key")
}

/// Key manager master public key, if stored.
pub fn fetch_master_km_pub_key(b: &dyn Bucket) -> Result<Option<Vec<u8>>> {
    Ok(b.get(keys::MASTER_KM_PUB_KEY)?)
}

/// Store the encrypted master HD keys given as `Some`.
pub fn put_master_hd_keys(
    b: &dyn Bucket,
    pub_key: Option<&[u8]>,
    priv_key: Option<&[u8]>,
) -> Result<()> {
    if let Some(priv_key) = priv_key {
        store(b, keys::MASTER_HD_PRIV, priv_key, "master HD private key")?;
    }
    if let Some(pub_key) = pub_key {
        store(b, keys::MASTER_HD_PUB, pub_key, "master HD public key")?;
    }
    Ok(())
}

/// Encrypted master HD keys; the public key is required.
pub fn fetch_master_hd_keys(b: &dyn Bucket) -> Result<MasterHdKeys> {
    Ok(MasterHdKeys {
        pub_key: required(b, keys::MASTER_HD_PUB, "master HD public key")?,
        priv_key: b.get(keys::MASTER_HD_PRIV)?,
    })
}

/// Store the keystore format version.
pub fn put_version(b: &dyn Bucket, version: u8) -> Result<()> {
    store(b, keys::KEYSTORE_VERSION, &[version], "keystore version")
}

/// Stored keystore version, or `None` if none was ever written.
pub fn fetch_version(b: &dyn Bucket) -> Result<Option<u8>> {
    Ok(b.get(keys::KEYSTORE_VERSION)?
        .and_then(|v| v.first().copied()))
}

/// Store the encrypted seed entropy.
pub fn put_entropy(b: &dyn Bucket, entropy_enc: &[u8]) -> Result<()> {
    store(b, keys::ENTROPY_ENC, entropy_enc, "encrypted entropy")
}

/// Encrypted seed entropy, if stored.
pub fn fetch_entropy(b: &dyn Bucket) -> Result<Option<Vec<u8>>> {
    Ok(b.get(keys::ENTROPY_ENC)?)
}

/// Store the encrypted crypto keys given as `Some`.
pub fn put_crypto_keys(
    b: &dyn Bucket,
    pub_key: Option<&[u8]>,
    priv_key: Option<&[u8]>,
    entropy_key: Option<&[u8]>,
) -> Result<()> {
    if let Some(pub_key) = pub_key {
        store(b, keys::CRYPTO_PUB_KEY, pub_key, "encrypted crypto public key")?;
    }
    if let Some(priv_key) = priv_key {
        store(b, keys::CRYPTO_PRIV_KEY, priv_key, "encrypted crypto private key")?;
    }
    if let Some(entropy_key) = entropy_key {
        store(b, keys::CRYPTO_ENTROPY_KEY, entropy_key, "encrypted crypto entropy key")?;
    }
    Ok(())
}

/// Encrypted crypto keys; the public key is required.
pub fn fetch_crypto_keys(b: &dyn Bucket) -> Result<CryptoKeys> {
    Ok(CryptoKeys {
        pub_key: required(b, keys::CRYPTO_PUB_KEY, "encrypted crypto public key")?,
        priv_key: b.get(keys::CRYPTO_PRIV_KEY)?,
        entropy_key: b.get(keys::CRYPTO_ENTROPY_KEY)?,
    })
}

/// Record `account` as the highest allocated account number.
pub fn put_account_usage(b: &dyn Bucket, account: u32) -> Result<()> {
    store(b, keys::ACCOUNT_USAGE, &encode_u32(account), "account usage")
}

/// Highest allocated account number.
pub fn fetch_account_usage(b: &dyn Bucket) -> Result<u32> {
    required_u32(b, keys::ACCOUNT_USAGE, "account usage")
}

/// Store `row` keyed by the account number.
pub fn put_account_row(b: &dyn Bucket, account: u32, row: &AccountRow) -> Result<()> {
    store(
        b,
        &encode_u32(account),
        &codec::serialize_account_row(row)?,
        "account",
    )
}

/// Store an HD account and raise the usage counter to `account`.
pub fn put_account_info(
    b: &dyn Bucket,
    account: u32,
    pub_key_encrypted: &[u8],
    priv_key_encrypted: &[u8],
) -> Result<()> {
    let raw = codec::serialize_hd_account_key(pub_key_encrypted, priv_key_encrypted)?;
    put_account_usage(b, account)?;
    put_account_row(b, account, &AccountRow::new(AccountType::Hd, raw))?;
    debug!(account, "stored account info");
    Ok(())
}

/// Decode the account stored under number `account`.
pub fn fetch_account_info(b: &dyn Bucket, account: u32) -> Result<AccountInfo> {
    let account_id = encode_u32(account);
    let data = b
        .get(&account_id)?
        .ok_or(KeystoreError::AccountNotFound(account))?;
    let row = codec::deserialize_account_row(&account_id, &data)?;
    match row.account_type()? {
        AccountType::Hd => Ok(AccountInfo::Hd(codec::deserialize_hd_account_key(
            &account_id,
            &row.raw_data,
        )?)),
    }
}

/// Numbers of every stored account row, ascending by key.
pub fn fetch_account_numbers(b: &dyn Bucket) -> Result<Vec<u32>> {
    b.get_by_prefix(&[])?
        .into_iter()
        .filter(|entry| {
            entry.key.len() == 4 && !keys::FIXED_NAMES.contains(&entry.key.as_slice())
        })
        .map(|entry| decode_u32("account", &entry.key, &entry.key))
        .collect()
}

/// Store the BIP44 coin type.
pub fn put_coin_type(b: &dyn Bucket, coin: u32) -> Result<()> {
    store(b, keys::COIN_TYPE, &encode_u32(coin), "coin type")
}

/// BIP44 coin type; required.
pub fn fetch_coin_type(b: &dyn Bucket) -> Result<u32> {
    required_u32(b, keys::COIN_TYPE, "coin type")
}

/// Mark `account_id` as present. Meant for a bucket holding nothing else.
pub fn put_account_id(b: &dyn Bucket, account_id: &[u8]) -> Result<()> {
    store(b, account_id, &[0], "account id")
}

/// Every id marked with [`put_account_id`], in key order.
pub fn fetch_account_ids(b: &dyn Bucket) -> Result<Vec<Vec<u8>>> {
    Ok(b.get_by_prefix(&[])?.into_iter().map(|e| e.key).collect())
}

/// Unmark `account_id`.
pub fn delete_account_id(b: &dyn Bucket, account_id: &[u8]) -> Result<()> {
    Ok(b.delete(account_id)?)
}

/// Store the free-form wallet remark.
pub fn put_remark(b: &dyn Bucket, remark: &[u8]) -> Result<()> {
    store(b, keys::REMARK, remark, "remark")
}

/// Remove the wallet remark.
pub fn delete_remark(b: &dyn Bucket) -> Result<()> {
    Ok(b.delete(keys::REMARK)?)
}

/// Wallet remark, if stored.
pub fn fetch_remark(b: &dyn Bucket) -> Result<Option<Vec<u8>>> {
    Ok(b.get(keys::REMARK)?)
}

/// Store both encrypted branch public keys.
pub fn put_branch_pub_keys(b: &dyn Bucket, internal: &[u8], external: &[u8]) -> Result<()> {
    store(b, keys::EXTERNAL_BRANCH_PUB_KEY, external, "external branch public key")?;
    store(b, keys::INTERNAL_BRANCH_PUB_KEY, internal, "internal branch public key")
}

/// Both encrypted branch public keys; each is required.
pub fn fetch_branch_pub_keys(b: &dyn Bucket) -> Result<BranchPubKeys> {
    let external = required(
        b,
        keys::EXTERNAL_BRANCH_PUB_KEY,
        "encrypted external branch public key",
    )?;
    let internal = required(
        b,
        keys::INTERNAL_BRANCH_PUB_KEY,
        "encrypted internal branch public key",
    )?;
    Ok(BranchPubKeys { internal, external })
}

/// Start both branches at child index 0.
pub fn init_branch_child_num(b: &dyn Bucket) -> Result<()> {
    update_child_num(b, Branch::External, 0)?;
    update_child_num(b, Branch::Internal, 0)
}

/// Set the next unused child index of `branch`.
pub fn update_child_num(b: &dyn Bucket, branch: Branch, next_index: u32) -> Result<()> {
    store(
        b,
        branch.child_num_key(),
        &encode_u32(next_index),
        branch.child_num_record(),
    )
}

/// Next unused child index of both branches.
pub fn fetch_child_num(b: &dyn Bucket) -> Result<ChildNums> {
    Ok(ChildNums {
        external: get_child_num(b, Branch::External)?,
        internal: get_child_num(b, Branch::Internal)?,
    })
}

/// Next unused child index of `branch`.
pub fn get_child_num(b: &dyn Bucket, branch: Branch) -> Result<u32> {
    required_u32(b, branch.child_num_key(), branch.child_num_record())
}

/// Store the encrypted public key of address `index` on `branch`.
pub fn put_encrypted_pub_key(b: &dyn Bucket, branch: u32, index: u32, pub_key: &[u8]) -> Result<()> {
    store(b, &address_key(branch, index), pub_key, "address public key")
}

/// Every per-address public key of the bucket, ordered by record id.
pub fn fetch_encrypted_pub_keys(b: &dyn Bucket) -> Result<Vec<EncryptedPubKey>> {
    b.get_by_prefix(&[])?
        .into_iter()
        .map(|entry| {
            let (branch, index) = parse_address_key(&entry.key)?;
            Ok(EncryptedPubKey {
                branch,
                index,
                pub_key_enc: entry.value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletdb_db::{BucketDb, Db, DbError};
    use walletdb_storage::SledStorage;

    /// Run `f` against a fresh bucket inside a write transaction that is
    /// rolled back afterwards.
    fn with_bucket(f: impl FnOnce(&dyn Bucket)) {
        let db = BucketDb::new(Box::new(SledStorage::open_temporary().unwrap()));
        let tx = db.begin_tx().unwrap();
        let bucket = tx.create_top_level_bucket("keystore").unwrap();
        f(bucket.as_ref());
        drop(bucket);
        tx.rollback().unwrap();
    }

    #[test]
    fn test_master_key_params() {
        with_bucket(|b| {
            assert!(matches!(
                fetch_master_key_params(b),
                Err(KeystoreError::MissingField("master public key parameters"))
            ));

            put_master_key_params(b, Some(b"pub"), None).unwrap();
            let params = fetch_master_key_params(b).unwrap();
            assert_eq!(params.pub_params, b"pub");
            assert_eq!(params.priv_params, None);

            put_master_key_params(b, None, Some(b"priv")).unwrap();
            let params = fetch_master_key_params(b).unwrap();
            assert_eq!(params.pub_params, b"pub");
            assert_eq!(params.priv_params.as_deref(), Some(&b"priv"[..]));
        });
    }

    #[test]
    fn test_crypto_keys_optional_fields() {
        with_bucket(|b| {
            put_crypto_keys(b, Some(b"cpub"), None, Some(b"")).unwrap();
            let keys = fetch_crypto_keys(b).unwrap();
            assert_eq!(keys.pub_key, b"cpub");
            assert_eq!(keys.priv_key, None);
            // An empty blob is stored and distinct from an absent one.
            assert_eq!(keys.entropy_key, Some(Vec::new()));
        });
    }

    #[test]
    fn test_missing_crypto_pub_key() {
        with_bucket(|b| {
            put_crypto_keys(b, None, Some(b"cpriv"), None).unwrap();
            let err = fetch_crypto_keys(b).unwrap_err();
            assert_eq!(
                err.to_string(),
                "required encrypted crypto public key not stored in database"
            );
        });
    }

    #[test]
    fn test_master_hd_and_km_keys() {
        with_bucket(|b| {
            assert_eq!(fetch_master_km_pub_key(b).unwrap(), None);
            put_master_km_pub_key(b, b"km").unwrap();
            assert_eq!(fetch_master_km_pub_key(b).unwrap(), Some(b"km".to_vec()));

            assert!(fetch_master_hd_keys(b).is_err());
            put_master_hd_keys(b, Some(b"hdpub"), Some(b"hdpriv")).unwrap();
            let keys = fetch_master_hd_keys(b).unwrap();
            assert_eq!(keys.pub_key, b"hdpub");
            assert_eq!(keys.priv_key, Some(b"hdpriv".to_vec()));
        });
    }

    #[test]
    fn test_version_and_entropy() {
        with_bucket(|b| {
            assert_eq!(fetch_version(b).unwrap(), None);
            put_version(b, 3).unwrap();
            assert_eq!(fetch_version(b).unwrap(), Some(3));

            assert_eq!(fetch_entropy(b).unwrap(), None);
            put_entropy(b, b"enc").unwrap();
            assert_eq!(fetch_entropy(b).unwrap(), Some(b"enc".to_vec()));
        });
    }

    #[test]
    fn test_account_info() {
        with_bucket(|b| {
            assert!(matches!(
                fetch_account_info(b, 2),
                Err(KeystoreError::AccountNotFound(2))
            ));
            assert!(fetch_account_usage(b).is_err());

            put_account_info(b, 2, b"pub", b"priv").unwrap();
            assert_eq!(fetch_account_usage(b).unwrap(), 2);
            let AccountInfo::Hd(key) = fetch_account_info(b, 2).unwrap();
            assert_eq!(key.pub_key_encrypted, b"pub");
            assert_eq!(key.priv_key_encrypted, b"priv");
        });
    }

    #[test]
    fn test_account_numbers_skip_fixed_records() {
        with_bucket(|b| {
            put_version(b, 1).unwrap();
            put_master_key_params(b, Some(b"pub"), None).unwrap();
            put_crypto_keys(b, Some(b"cpub"), None, Some(b"cent")).unwrap();
            put_account_info(b, 7, b"pub", b"priv").unwrap();
            put_account_info(b, 1, b"pub", b"priv").unwrap();
            // A huge usage counter does not imply that many rows.
            put_account_usage(b, u32::MAX).unwrap();

            assert_eq!(fetch_account_numbers(b).unwrap(), vec![1, 7]);
        });
    }

    #[test]
    fn test_account_row_errors() {
        with_bucket(|b| {
            b.put(&encode_u32(1), &[0, 0, 0, 0]).unwrap();
            assert!(matches!(
                fetch_account_info(b, 1),
                Err(KeystoreError::Malformed { record: "account", .. })
            ));

            put_account_row(b, 1, &AccountRow { acct_type: 4, raw_data: vec![] }).unwrap();
            assert!(matches!(
                fetch_account_info(b, 1),
                Err(KeystoreError::UnsupportedAccountType(4))
            ));
        });
    }

    #[test]
    fn test_coin_type() {
        with_bucket(|b| {
            assert!(matches!(
                fetch_coin_type(b),
                Err(KeystoreError::MissingField("coin type"))
            ));
            put_coin_type(b, 297).unwrap();
            assert_eq!(fetch_coin_type(b).unwrap(), 297);
        });
    }

    #[test]
    fn test_remark() {
        with_bucket(|b| {
            assert_eq!(fetch_remark(b).unwrap(), None);
            put_remark(b, b"savings").unwrap();
            assert_eq!(fetch_remark(b).unwrap(), Some(b"savings".to_vec()));
            delete_remark(b).unwrap();
            assert_eq!(fetch_remark(b).unwrap(), None);
        });
    }

    #[test]
    fn test_account_ids() {
        with_bucket(|b| {
            put_account_id(b, b"seed-b").unwrap();
            put_account_id(b, b"seed-a").unwrap();
            assert_eq!(b.get(b"seed-a").unwrap(), Some(vec![0]));
            assert_eq!(
                fetch_account_ids(b).unwrap(),
                vec![b"seed-a".to_vec(), b"seed-b".to_vec()]
            );

            delete_account_id(b, b"seed-a").unwrap();
            assert_eq!(fetch_account_ids(b).unwrap(), vec![b"seed-b".to_vec()]);
        });
    }

    #[test]
    fn test_branch_pub_keys() {
        with_bucket(|b| {
            assert!(fetch_branch_pub_keys(b).is_err());
            put_branch_pub_keys(b, b"in", b"ex").unwrap();
            let branch_keys = fetch_branch_pub_keys(b).unwrap();
            assert_eq!(branch_keys.internal, b"in");
            assert_eq!(branch_keys.external, b"ex");
            assert_eq!(b.get(keys::EXTERNAL_BRANCH_PUB_KEY).unwrap(), Some(b"ex".to_vec()));
        });
    }

    #[test]
    fn test_child_num() {
        with_bucket(|b| {
            assert!(matches!(
                get_child_num(b, Branch::Internal),
                Err(KeystoreError::MissingField("internal branch child number"))
            ));

            init_branch_child_num(b).unwrap();
            assert_eq!(fetch_child_num(b).unwrap(), ChildNums::default());

            update_child_num(b, Branch::External, 7).unwrap();
            assert_eq!(get_child_num(b, Branch::External).unwrap(), 7);
            assert_eq!(get_child_num(b, Branch::Internal).unwrap(), 0);
        });
    }

    #[test]
    fn test_pub_keys_reject_foreign_records() {
        with_bucket(|b| {
            put_encrypted_pub_key(b, 0, 1, b"k").unwrap();
            b.put(b"stray", b"x").unwrap();
            assert!(matches!(
                fetch_encrypted_pub_keys(b),
                Err(KeystoreError::Malformed { .. })
            ));
        });
    }

    #[test]
    fn test_store_error_context() {
        let db = BucketDb::new(Box::new(SledStorage::open_temporary().unwrap()));
        let tx = db.begin_tx().unwrap();
        tx.create_top_level_bucket("keystore").unwrap();
        tx.commit().unwrap();

        let tx = db.begin_read_tx().unwrap();
        let bucket = tx.top_level_bucket("keystore").unwrap().unwrap();
        let err = put_remark(bucket.as_ref(), b"x").unwrap_err();
        assert!(matches!(
            err,
            KeystoreError::Store {
                record: "remark",
                source: DbError::WriteNotAllowed
            }
        ));
        assert_eq!(
            err.to_string(),
            "failed to store remark: write not allowed in a read transaction"
        );
    }
}
