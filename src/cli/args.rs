//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// codecache - multi-root content cache
///
/// Resolves coordinates to cached files, fetching and materializing
/// misses under a cross-process entry lock.
#[derive(Parser, Debug)]
#[command(name = "codecache")]
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
    #[arg(short, long, global = true, env = "CODECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text", env = "CODECACHE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve coordinates to cached files, fetching misses
    Resolve(ResolveArgs),

    /// Search the cache roots without fetching
    Lookup(LookupArgs),

    /// Show configured cache roots
    Roots,

    /// Show entry locks currently held in the cache roots
    Locks,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Coordinates: local:<name>, a URL, or group:name:version[:ext]
    #[arg(required = true)]
    pub coordinates: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the lookup command
#[derive(Parser, Debug)]
pub struct LookupArgs {
    /// Coordinates to look up
    #[arg(required = true)]
    pub coordinates: Vec<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Set a scalar configuration value (e.g. cache.max_lock_wait_ms 5000)
    Set {
        /// Dot-separated key
        key: String,

        /// New value
        value: String,
    },
}

/// Output format for listings
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_resolve() {
        let cli = Cli::try_parse_from([
            "codecache",
            "-vv",
            "resolve",
            "local:file.txt",
            "org.example:core:1.0",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Resolve(args) => {
                assert_eq!(args.coordinates.len(), 2);
                assert!(matches!(args.format, OutputFormat::Json));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn resolve_requires_coordinates() {
        assert!(Cli::try_parse_from(["codecache", "resolve"]).is_err());
    }
}
