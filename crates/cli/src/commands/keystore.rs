//! Keystore inspection command.

use super::{find_bucket, open_db, BucketArgs};
use anyhow::Result;
use colored::Colorize;
use walletdb_db::{view, Bucket};
use walletdb_keystore::{self as ks, AccountInfo, Branch, KeystoreError};

/// Turn a missing mandatory record into `None`; keep every other failure.
fn optional<T>(result: ks::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(KeystoreError::MissingField(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn blob(value: Option<&[u8]>) -> String {
    match value {
        Some(v) => format!("{} bytes", v.len()),
        None => "-".bright_black().to_string(),
    }
}

fn field(name: &str, value: impl std::fmt::Display) {
    println!("  {:<22} {}", format!("{}:", name), value);
}

/// Every record of the keystore layout found in `b`, rendered as lines.
fn describe(b: &dyn Bucket) -> Result<()> {
    if let Some(version) = ks::fetch_version(b)? {
        field("Version", version);
    }
    if let Some(coin) = optional(ks::fetch_coin_type(b))? {
        field("Coin type", coin);
    }
    if let Some(remark) = ks::fetch_remark(b)? {
        field("Remark", String::from_utf8_lossy(&remark));
    }

    if let Some(params) = optional(ks::fetch_master_key_params(b))? {
        field("Master pub params", blob(Some(params.pub_params.as_slice())));
        field("Master priv params", blob(params.priv_params.as_deref()));
    }
    if let Some(keys) = optional(ks::fetch_crypto_keys(b))? {
        field("Crypto pub key", blob(Some(keys.pub_key.as_slice())));
        field("Crypto priv key", blob(keys.priv_key.as_deref()));
        field("Crypto entropy key", blob(keys.entropy_key.as_deref()));
    }
    if let Some(keys) = optional(ks::fetch_master_hd_keys(b))? {
        field("Master HD pub key", blob(Some(keys.pub_key.as_slice())));
        field("Master HD priv key", blob(keys.priv_key.as_deref()));
    }
    if let Some(km) = ks::fetch_master_km_pub_key(b)? {
        field("Key manager pub key", hex::encode(km));
    }
    if let Some(entropy) = ks::fetch_entropy(b)? {
        field("Encrypted entropy", blob(Some(entropy.as_slice())));
    }

    if let Some(keys) = optional(ks::fetch_branch_pub_keys(b))? {
        field("External branch key", blob(Some(keys.external.as_slice())));
        field("Internal branch key", blob(Some(keys.internal.as_slice())));
    }
    if let Some(external) = optional(ks::get_child_num(b, Branch::External))? {
        field("Next external index", external);
    }
    if let Some(internal) = optional(ks::get_child_num(b, Branch::Internal))? {
        field("Next internal index", internal);
    }

    if let Some(usage) = optional(ks::fetch_account_usage(b))? {
        field("Account usage", usage);
    }
    for account in ks::fetch_account_numbers(b)? {
        match ks::fetch_account_info(b, account) {
            Ok(AccountInfo::Hd(key)) => field(
                &format!("Account {}", account),
                format!(
                    "HD, pub {}, priv {}",
                    blob(Some(key.pub_key_encrypted.as_slice())),
                    blob(Some(key.priv_key_encrypted.as_slice()))
                ),
            ),
            Err(e) => field(&format!("Account {}", account), e.to_string().red()),
        }
    }
    Ok(())
}

pub fn run(args: BucketArgs) -> Result<()> {
    let db = open_db(&args.db)?;
    println!("{} {}", "Keystore".bold().cyan(), args.path.join("/").bold());
    view(db.as_ref(), |tx| describe(find_bucket(tx, &args.path)?.as_ref()))?;
    db.close()?;
    Ok(())
}
