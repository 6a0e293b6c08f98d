//! depstash - dependency cache for application builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use depstash::cli::{commands, Cli, Commands};
use depstash::config::ConfigManager;
use depstash::error::DepstashResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DepstashResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Config command must work even when the config file is broken
    if let Commands::Config(args) = cli.command {
        init_logging(cli.verbose, "text");
        return commands::config(args, &config_manager).await;
    }

    let config = config_manager.load().await?;
    init_logging(cli.verbose, &config.general.log_format);

    match cli.command {
        Commands::Config(_) => unreachable!("Config handled above"),
        Commands::Restore(args) => commands::restore(args, &config).await,
        Commands::Save(args) => commands::save(args, &config).await,
        Commands::Finalize(args) => commands::finalize(args, &config).await,
        Commands::Status(args) => commands::status(args, &config).await,
        Commands::Clear(args) => commands::clear(args, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug. Logs go to stderr so command output
/// on stdout stays machine-readable.
fn init_logging(verbose: u8, log_format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("depstash=warn"),
        1 => EnvFilter::new("depstash=info"),
        _ => EnvFilter::new("depstash=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log_format == "json" {
        builder.json().init();
    } else {
        builder.with_target(false).without_time().init();
    }
}
