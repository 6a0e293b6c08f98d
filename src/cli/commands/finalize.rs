//! Finalize command - restore, install dependencies, save

use super::restore::{restore_cache, show_directories};
use super::save::save_cache;
use crate::cache::CacheEngine;
use crate::cli::args::FinalizeArgs;
use crate::config::Config;
use crate::error::DepstashResult;
use crate::install::{has_vendored_modules, vendored_modules_empty, InstallOutcome, Installer, PackageTool};
use crate::process::{CommandRunner, SystemRunner};
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;
use tracing::debug;

const VENDORING_DOCS: &str = "http://docs.cloudfoundry.org/buildpacks/node/index.html#vendoring";

/// Execute the finalize command
pub async fn execute(args: FinalizeArgs, config: &Config) -> DepstashResult<()> {
    let ctx = UiContext::detect();
    let build_dir = args.dirs.build_dir.as_path();
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);

    // Inspect the build directory before restore can populate it
    let tool = PackageTool::detect(build_dir);
    let vendored = has_vendored_modules(build_dir);
    debug!("Package tool: {}, vendored node_modules: {}", tool, vendored);

    if !vendored || vendored_modules_empty(build_dir)? {
        ui::step_warn_hint(
            &ctx,
            "It is recommended to vendor the application's Node.js dependencies",
            VENDORING_DOCS,
        );
    }

    let (mut engine, source) =
        CacheEngine::open(runner.clone(), config, build_dir, &args.dirs.cache_dir).await?;
    show_directories(&ctx, &engine, source);

    restore_cache(&ctx, &mut engine).await?;

    if args.skip_install {
        ui::section(&ctx, "Building dependencies");
        ui::step_info(&ctx, "Skipping install (--skip-install)");
    } else {
        let node_home = std::env::var(&config.install.node_home_env).ok();
        let installer = Installer::new(runner, build_dir, node_home);
        install(&ctx, &installer, tool, vendored).await?;
    }

    save_cache(&ctx, &mut engine).await?;
    Ok(())
}

async fn install(
    ctx: &UiContext,
    installer: &Installer,
    tool: PackageTool,
    vendored: bool,
) -> DepstashResult<()> {
    ui::section(ctx, "Building dependencies");

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!("Running {} install...", tool));

    let outcome = match installer.install(tool, vendored).await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error(&format!("{} install failed", tool));
            return Err(e);
        }
    };

    match outcome {
        InstallOutcome::Skipped { reason } => spinner.stop(&format!("Skipping ({})", reason)),
        InstallOutcome::Rebuilt => spinner.stop("Rebuilt vendored node_modules"),
        InstallOutcome::Installed { source } => {
            spinner.stop(&format!("Installed node modules ({})", source))
        }
    }

    Ok(())
}
