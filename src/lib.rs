//! codecache - multi-root content cache
//!
//! Resolves coordinates to files across an ordered set of cache roots.
//! Misses are fetched and materialized into the writable root under a
//! per-entry lock file, giving mutual exclusion across tasks and processes
//! with a bounded wait.
//!
//! ```rust,no_run
//! use codecache::cache::{CacheRoot, CacheRootSet, CodeCache};
//! use codecache::fetch::{self, HttpFetcher, HttpFetcherConfig};
//! use codecache::Coordinates;
//! use std::time::Duration;
//!
//! # async fn example() -> codecache::CacheResult<()> {
//! let roots = CacheRootSet::new(vec![
//!     CacheRoot::read_only("/opt/shared-cache"),
//!     CacheRoot::writable("/home/me/.cache/codecache"),
//! ])?;
//! let http = HttpFetcherConfig {
//!     repository_url: "https://repo.maven.apache.org/maven2".to_string(),
//!     timeout: Duration::from_secs(60),
//!     max_bytes: 64 * 1024 * 1024,
//! };
//! let cache = CodeCache::new(
//!     roots,
//!     Duration::from_secs(30),
//!     fetch::factory(move || HttpFetcher::new(http.clone())),
//! );
//!
//! let path = cache.resolve(&"org.example:core:1.2.0".parse::<Coordinates>()?).await?;
//! println!("{}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinates;
pub mod error;
pub mod fetch;
pub mod ui;

pub use coordinates::Coordinates;
pub use error::{CacheError, CacheResult, ResolutionError, ResolutionErrorKind};
