//! Database lifecycle commands.

use super::DbArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use walletdb_db::default_registry;
use walletdb_storage::{check_version, read_version, SledConfig, CURRENT_STORAGE_VERSION};

pub fn drivers() -> Result<()> {
    println!("{}", "Registered drivers:".bold().cyan());
    for db_type in default_registry().registered_types() {
        println!("  {}", db_type.bright_yellow());
    }
    Ok(())
}

pub fn init(args: DbArgs) -> Result<()> {
    println!("{}", "Initializing wallet database...".bold().cyan());
    println!();

    let config = SledConfig::default();
    let db = default_registry()
        .create(&args.driver, &args.data_dir, &[&config])
        .with_context(|| format!("Failed to create database at {:?}", args.data_dir))?;
    db.close().with_context(|| "Failed to close database")?;

    println!(
        "{}  Created {} database at: {}",
        "✓".green().bold(),
        args.driver,
        args.data_dir.display().to_string().bright_black()
    );
    println!(
        "{}  Wrote version stamp (format {})",
        "✓".green().bold(),
        CURRENT_STORAGE_VERSION
    );
    Ok(())
}

pub fn check(args: DbArgs) -> Result<()> {
    let stamp = read_version(&args.data_dir)
        .with_context(|| format!("Failed to read version stamp in {:?}", args.data_dir))?;
    match &stamp {
        Some(stamp) => println!(
            "  Stamp:   {} v{}",
            stamp.dbtype.bright_yellow(),
            stamp.version
        ),
        None => println!("  Stamp:   {}", "missing".red()),
    }

    check_version(&args.driver, &args.data_dir, false)
        .with_context(|| format!("Version check failed for {:?}", args.data_dir))?;

    println!(
        "{}  {} database, format {}",
        "✓".green().bold(),
        args.driver,
        CURRENT_STORAGE_VERSION
    );
    Ok(())
}
