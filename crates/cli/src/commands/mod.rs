//! CLI commands module.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use walletdb_db::{default_registry, Bucket, Db, DbTransaction, ReadTransaction};
use walletdb_storage::{SledConfig, SLED_DB_TYPE};

mod bucket;
mod init;
mod keystore;

/// Location and driver of the database to operate on.
#[derive(Args)]
pub struct DbArgs {
    /// Directory holding the database
    #[arg(short, long, default_value = "./wallet_data")]
    data_dir: PathBuf,

    /// Database driver type
    #[arg(long, default_value = SLED_DB_TYPE)]
    driver: String,
}

/// A bucket inside the database, named by its path from the root.
#[derive(Args)]
pub struct BucketArgs {
    #[command(flatten)]
    db: DbArgs,

    /// Bucket names from the root down
    #[arg(required = true)]
    path: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the registered database drivers
    Drivers,
    /// Create a new database
    Init(DbArgs),
    /// Verify the version stamp of an existing database
    Check(DbArgs),
    /// List top-level buckets, or the children of a bucket
    Buckets {
        #[command(flatten)]
        db: DbArgs,

        /// Bucket names from the root down
        path: Vec<String>,
    },
    /// Print every key and value of a bucket
    Dump(BucketArgs),
    /// Decode the keystore records of a bucket
    Keystore(BucketArgs),
    /// Create a bucket, including missing parents
    Mkbucket(BucketArgs),
    /// Delete a bucket and everything under it
    Rmbucket(BucketArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Drivers => init::drivers(),
        Commands::Init(args) => init::init(args),
        Commands::Check(args) => init::check(args),
        Commands::Buckets { db, path } => bucket::list(db, path),
        Commands::Dump(args) => bucket::dump(args),
        Commands::Keystore(args) => keystore::run(args),
        Commands::Mkbucket(args) => bucket::make(args),
        Commands::Rmbucket(args) => bucket::remove(args),
    }
}

/// Open an existing database.
fn open_db(args: &DbArgs) -> Result<Box<dyn Db>> {
    let config = SledConfig::default();
    default_registry()
        .open(&args.driver, &args.data_dir, &[&config])
        .with_context(|| format!("Failed to open database at {:?}", args.data_dir))
}

/// Walk `path` from the root, fetching each level by its descriptor.
fn find_bucket<'t, T>(tx: &'t T, path: &[String]) -> Result<Box<dyn Bucket + 't>>
where
    T: ReadTransaction + ?Sized,
{
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| anyhow!("bucket path is empty"))?;
    let mut bucket = tx
        .top_level_bucket(first)?
        .ok_or_else(|| anyhow!("bucket not found: {}", first))?;

    for (depth, name) in rest.iter().enumerate() {
        let meta = bucket
            .bucket(name)?
            .ok_or_else(|| anyhow!("bucket not found: {}", path[..depth + 2].join("/")))?
            .meta()
            .clone();
        bucket = tx
            .fetch_bucket(&meta)?
            .ok_or_else(|| anyhow!("bucket vanished: {}", meta.paths().join("/")))?;
    }
    Ok(bucket)
}

/// Like [`find_bucket`], creating every missing level on the way.
fn make_bucket<'t, T>(tx: &'t T, path: &[String]) -> Result<Box<dyn Bucket + 't>>
where
    T: DbTransaction + ?Sized,
{
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| anyhow!("bucket path is empty"))?;
    let mut bucket = match tx.top_level_bucket(first)? {
        Some(bucket) => bucket,
        None => tx.create_top_level_bucket(first)?,
    };

    for name in rest {
        let meta = match bucket.bucket(name)? {
            Some(child) => child.meta().clone(),
            None => bucket.new_bucket(name)?.meta().clone(),
        };
        bucket = tx
            .fetch_bucket(&meta)?
            .ok_or_else(|| anyhow!("bucket vanished: {}", meta.paths().join("/")))?;
    }
    Ok(bucket)
}
