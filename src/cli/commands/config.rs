//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{CacheError, CacheResult};
use crate::ui::{self, UiContext};

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> CacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> CacheResult<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;

    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    apply_value(&mut config, key, value)?;

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Update one scalar key of `config`
fn apply_value(config: &mut Config, key: &str, value: &str) -> CacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["cache", "max_lock_wait_ms"] => config.cache.max_lock_wait_ms = parse_u64(value)?,
        ["cache", "poll_interval_ms"] => config.cache.poll_interval_ms = parse_u64(value)?,
        ["fetch", "repository_url"] => config.fetch.repository_url = value.to_string(),
        ["fetch", "timeout_secs"] => config.fetch.timeout_secs = parse_u64(value)?,
        ["fetch", "max_bytes"] => config.fetch.max_bytes = parse_u64(value)?,
        _ => {
            return Err(CacheError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    Ok(())
}

const VALID_KEYS: &[&str] = &[
    "cache.max_lock_wait_ms",
    "cache.poll_interval_ms",
    "fetch.repository_url",
    "fetch.timeout_secs",
    "fetch.max_bytes",
];

fn parse_u64(value: &str) -> CacheResult<u64> {
    value
        .parse()
        .map_err(|_| CacheError::User(format!("Invalid number: {}", value)))
}
