//! Clear command - discard the whole cache

use crate::cache::CacheStore;
use crate::cli::args::ClearArgs;
use crate::config::Config;
use crate::error::{DepstashError, DepstashResult};
use crate::ui::{self, UiContext};
use std::io::{self, Write};

/// Execute the clear command
pub async fn execute(args: ClearArgs, _config: &Config) -> DepstashResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let store = CacheStore::open(&args.cache_dir).await?;

    let populated = match std::fs::read_dir(store.root()) {
        Ok(mut entries) => entries.next().is_some(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            return Err(DepstashError::io(
                format!("reading {}", store.root().display()),
                e,
            ))
        }
    };

    if !populated {
        println!("Cache at {} is already empty.", store.root().display());
        return Ok(());
    }

    if let Some(manifest) = store.load_manifest().await? {
        println!("This will remove the cache saved {}:", manifest.saved_at.format("%Y-%m-%d %H:%M"));
        for dir in &manifest.directories {
            println!("  {} {}", console::style("•").red(), dir);
        }
        println!();
    }

    if !ctx.auto_yes() {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.clear().await?;
    ui::step_ok_detail(&ctx, "Cache cleared", &store.root().display().to_string());

    Ok(())
}
