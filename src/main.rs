//! codecache - multi-root content cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use codecache::cli::{Cli, Commands, LogFormat};
use codecache::config::ConfigManager;
use codecache::error::CacheResult;
use console::style;
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

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);
    codecache::ui::init_theme();

    let manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load().await?;

    match cli.command {
        Commands::Resolve(args) => codecache::cli::commands::resolve(args, &config).await,
        Commands::Lookup(args) => codecache::cli::commands::lookup(args, &config).await,
        Commands::Roots => codecache::cli::commands::roots(&config).await,
        Commands::Locks => codecache::cli::commands::locks(&config).await,
        Commands::Config(args) => codecache::cli::commands::config(args, &manager, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` wins when set
fn init_logging(verbose: u8, format: LogFormat) {
    let default = match verbose {
        0 => "codecache=warn",
        1 => "codecache=info",
        _ => "codecache=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.with_target(false).without_time().init(),
        LogFormat::Json => builder.json().init(),
    }
}
