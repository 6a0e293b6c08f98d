//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// depstash - dependency cache for application builds
///
/// Restores package manager directories from a durable cache root before
/// install and saves them back afterwards, discarding everything when the
/// Node toolchain changes.
#[derive(Parser, Debug)]
#[command(name = "depstash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DEPSTASH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy cached directories into the build directory
    Restore(BuildArgs),

    /// Copy configured directories from the build directory into the cache
    Save(BuildArgs),

    /// Restore, install dependencies, then save
    Finalize(FinalizeArgs),

    /// Show what the cache holds and whether it is reusable
    Status(StatusArgs),

    /// Discard the whole cache
    Clear(ClearArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Locations of the two roots
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Application build directory
    #[arg(short, long, env = "DEPSTASH_BUILD_DIR")]
    pub build_dir: PathBuf,

    /// Durable cache directory
    #[arg(short = 'C', long, env = "DEPSTASH_CACHE_DIR")]
    pub cache_dir: PathBuf,
}

/// Arguments for the finalize command
#[derive(Parser, Debug)]
pub struct FinalizeArgs {
    #[command(flatten)]
    pub dirs: BuildArgs,

    /// Restore and save only, without running npm or yarn
    #[arg(long)]
    pub skip_install: bool,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Durable cache directory
    #[arg(short = 'C', long, env = "DEPSTASH_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Durable cache directory
    #[arg(short = 'C', long, env = "DEPSTASH_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for the status command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Stored directories, one per line
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_restore() {
        let cli = Cli::parse_from([
            "depstash",
            "restore",
            "--build-dir",
            "/tmp/app",
            "--cache-dir",
            "/tmp/cache",
        ]);
        match cli.command {
            Commands::Restore(args) => {
                assert_eq!(args.build_dir, PathBuf::from("/tmp/app"));
                assert_eq!(args.cache_dir, PathBuf::from("/tmp/cache"));
            }
            _ => panic!("expected Restore command"),
        }
    }

    #[test]
    fn cli_parses_save_short_flags() {
        let cli = Cli::parse_from(["depstash", "save", "-b", "/tmp/app", "-C", "/tmp/cache"]);
        assert!(matches!(cli.command, Commands::Save(_)));
    }

    #[test]
    fn cli_parses_finalize() {
        let cli = Cli::parse_from([
            "depstash",
            "finalize",
            "--build-dir",
            "/tmp/app",
            "--cache-dir",
            "/tmp/cache",
            "--skip-install",
        ]);
        match cli.command {
            Commands::Finalize(args) => {
                assert!(args.skip_install);
                assert_eq!(args.dirs.build_dir, PathBuf::from("/tmp/app"));
            }
            _ => panic!("expected Finalize command"),
        }
    }

    #[test]
    fn cli_parses_status_format() {
        let cli = Cli::parse_from(["depstash", "status", "-C", "/tmp/cache", "--format", "json"]);
        match cli.command {
            Commands::Status(args) => assert_eq!(args.format, OutputFormat::Json),
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn cli_parses_clear_yes() {
        let cli = Cli::parse_from(["depstash", "clear", "-C", "/tmp/cache", "--yes"]);
        match cli.command {
            Commands::Clear(args) => assert!(args.yes),
            _ => panic!("expected Clear command"),
        }
    }

    #[test]
    fn cli_parses_config_init() {
        let cli = Cli::parse_from(["depstash", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Init { force }),
            }) => assert!(force),
            _ => panic!("expected Config Init command"),
        }
    }

    #[test]
    fn cli_counts_verbosity() {
        let cli = Cli::parse_from(["depstash", "-vv", "config", "path"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn restore_requires_both_roots() {
        let result = Cli::try_parse_from(["depstash", "restore", "--build-dir", "/tmp/app"]);
        if std::env::var_os("DEPSTASH_CACHE_DIR").is_none() {
            assert!(result.is_err());
        }
    }
}
