//! Save command - copy configured directories into the cache

use super::restore::show_directories;
use crate::cache::{CacheEngine, SaveReport};
use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::DepstashResult;
use crate::process::SystemRunner;
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;

/// Execute the save command
pub async fn execute(args: BuildArgs, config: &Config) -> DepstashResult<()> {
    let ctx = UiContext::detect();
    let (mut engine, source) = CacheEngine::open(
        Arc::new(SystemRunner),
        config,
        &args.build_dir,
        &args.cache_dir,
    )
    .await?;

    show_directories(&ctx, &engine, source);
    save_cache(&ctx, &mut engine).await?;
    Ok(())
}

pub(crate) async fn save_cache(
    ctx: &UiContext,
    engine: &mut CacheEngine,
) -> DepstashResult<SaveReport> {
    ui::section(ctx, "Caching directories for future builds");

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start("Saving cache...");

    let report = match engine.save().await {
        Ok(report) => report,
        Err(e) => {
            spinner.stop_error("Save failed; previous cache left in place");
            return Err(e);
        }
    };

    spinner.stop(&format!("Saved {} directories", report.saved.len()));

    for dir in &report.saved {
        ui::step_ok(ctx, dir);
    }
    for dir in &report.absent {
        ui::remark(ctx, &format!("- {} (nothing to cache)", dir));
    }
    for dir in &report.pruned {
        ui::remark(ctx, &format!("- {} (no longer configured, removed)", dir));
    }

    Ok(report)
}
