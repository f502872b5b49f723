//! Console output for the `codecache` binary
//!
//! Decorated output through `cliclack` and `indicatif` in a terminal,
//! plain prefixed lines in CI or when piped.

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{
    key_value, key_value_status, remark, section, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn_hint,
};
pub use progress::ResolveProgress;
pub use theme::{init_theme, CodecacheTheme};
