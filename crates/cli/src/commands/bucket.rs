//! Bucket inspection and maintenance commands.

use super::{find_bucket, make_bucket, open_db, BucketArgs, DbArgs};
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use tracing::debug;
use walletdb_db::{update, view};

pub fn list(args: DbArgs, path: Vec<String>) -> Result<()> {
    let db = open_db(&args)?;
    let names = view(db.as_ref(), |tx| {
        if path.is_empty() {
            Ok(tx.bucket_names()?)
        } else {
            Ok::<_, anyhow::Error>(find_bucket(tx, &path)?.bucket_names()?)
        }
    })?;
    db.close()?;

    let title = if path.is_empty() {
        "/".to_string()
    } else {
        path.join("/")
    };
    println!("{} {}", "Buckets in".bold().cyan(), title.bold());
    if names.is_empty() {
        println!("  {}", "(none)".bright_black());
    }
    for name in names {
        println!("  {}", name.bright_yellow());
    }
    Ok(())
}

pub fn dump(args: BucketArgs) -> Result<()> {
    let db = open_db(&args.db)?;
    let (entries, children) = view(db.as_ref(), |tx| {
        let bucket = find_bucket(tx, &args.path)?;
        let mut entries = Vec::new();
        let mut iter = bucket.new_iterator(None);
        while iter.next() {
            if let (Some(key), Some(value)) = (iter.key(), iter.value()) {
                entries.push((key.to_vec(), value.to_vec()));
            }
        }
        if let Some(err) = iter.take_error() {
            return Err(anyhow!(err).context("Bucket scan failed"));
        }
        Ok((entries, bucket.bucket_names()?))
    })?;
    db.close()?;

    println!("{} {}", "Bucket".bold().cyan(), args.path.join("/").bold());
    for child in &children {
        println!("  {} {}", "bucket".bright_black(), child.bright_yellow());
    }
    for (key, value) in &entries {
        println!("  {} = {}", hex::encode(key).bright_yellow(), hex::encode(value));
    }
    println!();
    println!("{} keys, {} child buckets", entries.len(), children.len());
    Ok(())
}

pub fn make(args: BucketArgs) -> Result<()> {
    let db = open_db(&args.db)?;
    update(db.as_ref(), |tx| make_bucket(tx, &args.path).map(|_| ()))
        .with_context(|| format!("Failed to create bucket {}", args.path.join("/")))?;
    db.close()?;

    println!(
        "{}  Created bucket {}",
        "✓".green().bold(),
        args.path.join("/").bright_yellow()
    );
    Ok(())
}

pub fn remove(args: BucketArgs) -> Result<()> {
    let (name, parent) = args
        .path
        .split_last()
        .ok_or_else(|| anyhow!("bucket path is empty"))?;

    let db = open_db(&args.db)?;
    update(db.as_ref(), |tx| {
        if parent.is_empty() {
            tx.delete_top_level_bucket(name)?;
        } else {
            find_bucket(tx, parent)?.delete_bucket(name)?;
        }
        Ok::<_, anyhow::Error>(())
    })
    .with_context(|| format!("Failed to delete bucket {}", args.path.join("/")))?;
    db.close()?;

    debug!(path = %args.path.join("/"), "bucket removed");
    println!(
        "{}  Deleted bucket {}",
        "✓".green().bold(),
        args.path.join("/").bright_yellow()
    );
    Ok(())
}
