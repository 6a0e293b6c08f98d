//! Status command - show what the cache holds and whether it is reusable

use crate::cache::{compute_signature, BinarySignature, CacheManifest, CacheStore};
use crate::cli::args::{OutputFormat, StatusArgs};
use crate::config::Config;
use crate::error::DepstashResult;
use crate::process::SystemRunner;
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Snapshot of a cache root
#[derive(Debug, Serialize)]
struct CacheStatus {
    cache_dir: PathBuf,
    manifest: Option<CacheManifest>,
    stored: Vec<StoredDirectory>,
    current_signature: Option<BinarySignature>,
    reusable: bool,
}

#[derive(Debug, Serialize)]
struct StoredDirectory {
    path: String,
    present: bool,
}

/// Execute the status command
pub async fn execute(args: StatusArgs, config: &Config) -> DepstashResult<()> {
    let store = CacheStore::open(&args.cache_dir).await?;
    let manifest = store.load_manifest().await?;

    let current_signature = match compute_signature(&SystemRunner, &config.signature).await {
        Ok(signature) => Some(signature),
        Err(e) => {
            debug!("Toolchain probe failed: {}", e);
            None
        }
    };

    let stored = manifest
        .as_ref()
        .map(|m| {
            m.directories
                .iter()
                .map(|dir| StoredDirectory {
                    path: dir.clone(),
                    present: store.has_directory(dir),
                })
                .collect()
        })
        .unwrap_or_default();

    let reusable = match (&manifest, &current_signature) {
        (Some(m), Some(current)) => &m.signature == current,
        _ => false,
    };

    let status = CacheStatus {
        cache_dir: args.cache_dir,
        manifest,
        stored,
        current_signature,
        reusable,
    };

    match args.format {
        OutputFormat::Table => print_status_table(&status),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Plain => print_status_plain(&status),
    }

    Ok(())
}

fn print_status_table(status: &CacheStatus) {
    println!("Cache: {}", status.cache_dir.display());
    println!();

    let Some(ref manifest) = status.manifest else {
        println!("No cache saved yet.");
        return;
    };

    println!(
        "Saved:      {}",
        manifest.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Signature:  {}", display_signature(&manifest.signature));

    let current = match status.current_signature {
        Some(ref signature) if status.reusable => {
            format!("{} {}", display_signature(signature), style("(matches)").green())
        }
        Some(ref signature) => {
            format!("{} {}", display_signature(signature), style("(differs)").yellow())
        }
        None => style("unknown (toolchain probe failed)").dim().to_string(),
    };
    println!("Toolchain:  {}", current);
    println!();

    println!("{:<40} {:<10}", "DIRECTORY", "STORED");
    println!("{}", "-".repeat(51));
    for dir in &status.stored {
        let present = if dir.present {
            style("yes").green().to_string()
        } else {
            style("no").dim().to_string()
        };
        println!("{:<40} {:<10}", dir.path, present);
    }

    println!();
    println!(
        "Total: {} of {} directories stored",
        status.stored.iter().filter(|d| d.present).count(),
        status.stored.len()
    );
}

fn print_status_plain(status: &CacheStatus) {
    for dir in status.stored.iter().filter(|d| d.present) {
        println!("{}", dir.path);
    }
}

fn display_signature(signature: &BinarySignature) -> String {
    if signature.as_str().is_empty() {
        "(no binaries probed)".to_string()
    } else {
        signature.to_string()
    }
}
