//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::{style, Style};

#[derive(Debug, Clone, Copy)]
enum Level {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Level {
    fn plain_prefix(self) -> String {
        match self {
            Self::Ok => style("[OK]").green().to_string(),
            Self::Warn => style("[WARN]").yellow().to_string(),
            Self::Fail => style("[FAIL]").red().to_string(),
            Self::Info => style("[INFO]").cyan().to_string(),
        }
    }
}

/// Print one step line, through cliclack when interactive
fn emit(ctx: &UiContext, level: Level, line: String) {
    if !ctx.use_fancy_output() {
        println!("  {} {}", level.plain_prefix(), line);
        return;
    }

    let _ = match level {
        Level::Ok => cliclack::log::success(line),
        Level::Warn => cliclack::log::warning(line),
        Level::Fail => cliclack::log::error(line),
        Level::Info => cliclack::log::info(line),
    };
}

/// Display a section header
pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        let _ = cliclack::log::info(style(title).bold());
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Ok, message.to_string());
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    emit(ctx, Level::Ok, format!("{} ({})", message, style(detail).dim()));
}

pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    emit(ctx, Level::Warn, format!("{} - {}", message, style(hint).dim()));
}

pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    emit(ctx, Level::Fail, format!("{}: {}", message, style(detail).red()));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Info, message.to_string());
}

/// Display a dim remark
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::log::remark(message);
    } else {
        println!("  {}", style(message).dim());
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print a key-value pair colored by status
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    if ctx.use_fancy_output() {
        let value_style = if ok {
            Style::new().green()
        } else {
            Style::new().yellow()
        };
        println!("  {}: {}", style(key).dim(), value_style.apply_to(value));
    } else {
        let level = if ok { Level::Ok } else { Level::Warn };
        println!("  {} {}: {}", level.plain_prefix(), key, value);
    }
}
