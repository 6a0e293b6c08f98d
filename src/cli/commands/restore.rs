//! Restore command - copy cached directories into the build directory

use crate::cache::{CacheEngine, DirectorySource, RestoreOutcome, RestoreReport};
use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::DepstashResult;
use crate::process::SystemRunner;
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;

/// Execute the restore command
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
    restore_cache(&ctx, &mut engine).await?;
    Ok(())
}

/// Print the resolved directory list and where it came from
pub(crate) fn show_directories(ctx: &UiContext, engine: &CacheEngine, source: DirectorySource) {
    ui::key_value(ctx, "cache directories", &engine.directories().join(", "));
    ui::key_value(ctx, "from", &source.to_string());
}

pub(crate) async fn restore_cache(
    ctx: &UiContext,
    engine: &mut CacheEngine,
) -> DepstashResult<RestoreReport> {
    ui::section(ctx, "Restoring cache");

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start("Restoring cached directories...");

    let report = match engine.restore().await {
        Ok(report) => report,
        Err(e) => {
            spinner.stop_error("Restore failed");
            return Err(e);
        }
    };

    match report.outcome {
        RestoreOutcome::NoCache => spinner.stop("No cache to restore"),
        RestoreOutcome::Invalidated { .. } => {
            spinner.stop("Skipping cache restore (new runtime signature)")
        }
        RestoreOutcome::Reused => spinner.stop(&format!(
            "Restored {} of {} directories",
            report.restored.len(),
            engine.directories().len()
        )),
    }

    for dir in &report.restored {
        ui::step_ok(ctx, dir);
    }
    if report.outcome == RestoreOutcome::Reused {
        for dir in &report.missing {
            ui::remark(ctx, &format!("- {} (not cached - skipping)", dir));
        }
    }

    Ok(report)
}
