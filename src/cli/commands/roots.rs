//! Roots command - show the configured search path

use crate::cache::CacheRootSet;
use crate::config::Config;
use crate::error::CacheResult;
use crate::ui::{self, UiContext};

/// Execute the roots command
pub async fn execute(config: &Config) -> CacheResult<()> {
    let roots = CacheRootSet::new(config.cache.roots.clone())?;
    let ctx = UiContext::detect();
    let write_target = roots.writable_root().path().to_path_buf();

    ui::section(&ctx, "Cache roots (search order)");
    for (index, root) in roots.iter().enumerate() {
        let mode = if root.path() == write_target {
            "writable, write target"
        } else if root.is_writable() {
            "writable, search only"
        } else {
            "read-only"
        };
        let exists = root.path().is_dir();
        ui::key_value_status(
            &ctx,
            &format!("{}. {}", index + 1, root.path().display()),
            if exists { mode } else { "missing" },
            exists,
        );
    }

    ui::section(&ctx, "Locking");
    ui::key_value(
        &ctx,
        "max lock wait",
        &format!("{:?}", config.cache.max_lock_wait()),
    );
    ui::key_value(
        &ctx,
        "poll interval",
        &format!("{:?}", config.cache.poll_interval()),
    );

    Ok(())
}
