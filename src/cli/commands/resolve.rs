//! Resolve command - materialize coordinates and print their paths

use crate::cache::CodeCache;
use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::config::Config;
use crate::coordinates::Coordinates;
use crate::error::{CacheError, CacheResult, ResolutionError};
use crate::ui::{self, ResolveProgress, UiContext};
use console::style;
use futures_util::future::join_all;
use std::path::PathBuf;
use tracing::debug;

type Outcome = (Coordinates, Result<PathBuf, ResolutionError>);

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> CacheResult<()> {
    let coordinates = parse_all(&args.coordinates)?;
    let cache = CodeCache::from_config(config)?;
    let ctx = UiContext::detect();

    let progress = ResolveProgress::new(&ctx, coordinates.len() as u64);
    let outcomes: Vec<Outcome> = join_all(coordinates.into_iter().map(|c| {
        let cache = &cache;
        let progress = &progress;
        async move {
            let result = cache.resolve(&c).await;
            progress.advance(&c.to_string());
            (c, result)
        }
    }))
    .await;
    progress.finish();

    debug!("Resolution stats: {:?}", cache.stats());

    match args.format {
        OutputFormat::Table => print_table(&ctx, &outcomes),
        OutputFormat::Json => print_json(&outcomes)?,
        OutputFormat::Plain => print_plain(&outcomes),
    }

    match outcomes.into_iter().find_map(|(_, r)| r.err()) {
        Some(err) => Err(CacheError::Resolution(err)),
        None => Ok(()),
    }
}

/// Parse every coordinate argument, failing on the first malformed one
pub(crate) fn parse_all(raw: &[String]) -> CacheResult<Vec<Coordinates>> {
    raw.iter().map(|s| s.parse()).collect()
}

fn print_table(ctx: &UiContext, outcomes: &[Outcome]) {
    for (coordinates, result) in outcomes {
        match result {
            Ok(path) => ui::step_ok_detail(ctx, &coordinates.to_string(), &path.display().to_string()),
            Err(e) => ui::step_error_detail(ctx, &coordinates.to_string(), &e.kind.to_string()),
        }
    }

    let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
    println!();
    if failed == 0 {
        println!("{} resolved", style(outcomes.len()).green());
    } else {
        println!(
            "{} resolved, {} failed",
            outcomes.len() - failed,
            style(failed).red()
        );
    }
}

fn print_json(outcomes: &[Outcome]) -> CacheResult<()> {
    #[derive(serde::Serialize)]
    struct OutcomeJson {
        coordinates: String,
        path: Option<PathBuf>,
        error: Option<String>,
        retryable: bool,
    }

    let entries: Vec<OutcomeJson> = outcomes
        .iter()
        .map(|(coordinates, result)| OutcomeJson {
            coordinates: coordinates.to_string(),
            path: result.as_ref().ok().cloned(),
            error: result.as_ref().err().map(|e| e.kind.to_string()),
            retryable: result.as_ref().err().is_some_and(ResolutionError::is_retryable),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn print_plain(outcomes: &[Outcome]) {
    for (_, result) in outcomes {
        if let Ok(path) = result {
            println!("{}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_accepts_mixed_forms() {
        let raw = vec![
            "local:a.txt".to_string(),
            "https://example.com/b.zip".to_string(),
            "org.example:core:1.0".to_string(),
        ];
        assert_eq!(parse_all(&raw).unwrap().len(), 3);
    }

    #[test]
    fn parse_all_fails_on_malformed() {
        let raw = vec!["a.txt".to_string(), "a:b".to_string()];
        assert!(matches!(
            parse_all(&raw),
            Err(CacheError::InvalidCoordinates(_))
        ));
    }
}
