//! Locks command - show entry locks present in the cache roots

use crate::cache::{held_locks, CacheRootSet};
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::ui::{self, UiContext};
use chrono::Utc;

/// Execute the locks command
pub async fn execute(config: &Config) -> CacheResult<()> {
    let roots = CacheRootSet::new(config.cache.roots.clone())?;
    let ctx = UiContext::detect();
    let mut total = 0;

    for root in roots.iter() {
        let locks = held_locks(root.path()).await.map_err(|e| {
            CacheError::io(format!("listing locks in {}", root.path().display()), e)
        })?;

        for (filename, info) in locks {
            total += 1;
            match info {
                Some(info) => {
                    let age = Utc::now().signed_duration_since(info.acquired_at);
                    ui::step_warn_hint(
                        &ctx,
                        &format!("{} ({})", filename, root.path().display()),
                        &format!("held by {} for {}s", info, age.num_seconds()),
                    );
                }
                None => ui::step_warn_hint(
                    &ctx,
                    &format!("{} ({})", filename, root.path().display()),
                    "holder unknown",
                ),
            }
        }
    }

    if total == 0 {
        ui::step_info(&ctx, "No entry locks held");
    } else {
        ui::remark(
            &ctx,
            "Locks disappear when their holder finishes; codecache never breaks them",
        );
    }

    Ok(())
}
