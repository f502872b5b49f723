//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for a batch of resolutions.
///
/// Shows an indicatif bar in interactive mode, one plain line per
/// finished coordinate on stderr in CI.
pub struct ResolveProgress {
    bar: Option<ProgressBar>,
}

impl ResolveProgress {
    /// Create a progress indicator for `total` coordinates
    pub fn new(ctx: &UiContext, total: u64) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total);
            let bar_style = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Resolving  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(bar_style);
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            None
        };
        Self { bar }
    }

    /// Record one finished coordinate
    pub fn advance(&self, label: &str) {
        if let Some(ref bar) = self.bar {
            bar.inc(1);
            bar.set_message(label.to_string());
        } else {
            eprintln!("{} {}", style("...").dim(), label);
        }
    }

    /// Finish and clear the progress bar.
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = ResolveProgress::new(&ctx, 2);
        progress.advance("local:a.txt");
        progress.advance("local:b.txt");
        progress.finish();
        // Should not panic
    }
}
