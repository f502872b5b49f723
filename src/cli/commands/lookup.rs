//! Lookup command - search the roots without fetching

use crate::cache::CodeCache;
use crate::cli::args::LookupArgs;
use crate::cli::commands::resolve::parse_all;
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::{self, UiContext};

/// Execute the lookup command
pub async fn execute(args: LookupArgs, config: &Config) -> CacheResult<()> {
    let coordinates = parse_all(&args.coordinates)?;
    let cache = CodeCache::from_config(config)?;
    let ctx = UiContext::detect();

    for c in &coordinates {
        match cache.lookup(c).await? {
            Some(path) => ui::step_ok_detail(&ctx, &c.to_string(), &path.display().to_string()),
            None => ui::step_warn_hint(&ctx, &c.to_string(), "not cached"),
        }
    }

    Ok(())
}
