//! Entry resolution
//!
//! `CodeCache` searches every root, and on a miss locks the entry in the
//! writable root, checks again, fetches and materializes it.

use crate::cache::lock::{self, EntryLock, DEFAULT_POLL_INTERVAL};
use crate::cache::materialize;
use crate::cache::roots::{CacheRoot, CacheRootSet};
use crate::config::Config;
use crate::coordinates::{validate_filename, Coordinates};
use crate::error::{CacheResult, ResolutionError, ResolutionErrorKind};
use crate::fetch::{self, Fetcher, FetcherFactory, HttpFetcher, HttpFetcherConfig};
use futures_util::future::try_join_all;
use serde::Serialize;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Snapshot of resolution counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Found by the initial search
    pub hits: u64,
    /// Not found by the initial search
    pub misses: u64,
    /// Found by the re-check after waiting for the lock
    pub late_hits: u64,
    /// Entries fetched and materialized
    pub fetches: u64,
    pub lock_timeouts: u64,
    pub fetch_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    late_hits: AtomicU64,
    fetches: AtomicU64,
    lock_timeouts: AtomicU64,
    fetch_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            late_hits: self.late_hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Multi-root content cache
pub struct CodeCache {
    roots: CacheRootSet,
    max_lock_wait: Duration,
    poll_interval: Duration,
    holder: String,
    fetcher_factory: FetcherFactory,
    fetcher: OnceCell<Arc<dyn Fetcher>>,
    counters: Counters,
}

impl CodeCache {
    /// Create a cache over `roots`.
    ///
    /// `fetcher_factory` is only invoked on the first miss.
    pub fn new(roots: CacheRootSet, max_lock_wait: Duration, fetcher_factory: FetcherFactory) -> Self {
        Self {
            roots,
            max_lock_wait,
            poll_interval: DEFAULT_POLL_INTERVAL,
            holder: format!("codecache-{}", Uuid::new_v4().simple()),
            fetcher_factory,
            fetcher: OnceCell::new(),
            counters: Counters::default(),
        }
    }

    /// Build a cache from configuration, fetching over HTTP
    pub fn from_config(config: &Config) -> CacheResult<Self> {
        let roots = CacheRootSet::new(config.cache.roots.clone())?;
        let http = HttpFetcherConfig::from(&config.fetch);

        Ok(Self::new(
            roots,
            config.cache.max_lock_wait(),
            fetch::factory(move || HttpFetcher::new(http.clone())),
        )
        .with_poll_interval(config.cache.poll_interval()))
    }

    /// First poll interval while waiting for a busy entry
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Identity written into lock files held by this cache
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    pub fn roots(&self) -> &CacheRootSet {
        &self.roots
    }

    pub fn max_lock_wait(&self) -> Duration {
        self.max_lock_wait
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Search the roots without locking or fetching
    pub async fn lookup(&self, coordinates: &Coordinates) -> Result<Option<PathBuf>, ResolutionError> {
        let filename = checked_filename(coordinates)?;
        self.search(coordinates, &filename).await
    }

    /// Path of the complete entry for `coordinates`, fetching it on a miss
    pub async fn resolve(&self, coordinates: &Coordinates) -> Result<PathBuf, ResolutionError> {
        let filename = checked_filename(coordinates)?;

        if let Some(path) = self.search(coordinates, &filename).await? {
            Counters::bump(&self.counters.hits);
            return Ok(path);
        }
        Counters::bump(&self.counters.misses);
        debug!("Cache miss for {}", coordinates);

        let root = self.roots.writable_root();
        fs::create_dir_all(root.path()).await.map_err(|e| {
            ResolutionError::io(
                coordinates,
                format!("creating cache root {}", root.path().display()),
                e,
            )
        })?;

        let result = self
            .with_file_lock(root, &filename, coordinates, || async {
                if let Some(path) = self.search(coordinates, &filename).await? {
                    debug!("{} appeared while waiting for the lock", coordinates);
                    Counters::bump(&self.counters.late_hits);
                    return Ok(path);
                }
                self.fetch_and_materialize(root, &filename, coordinates).await
            })
            .await;

        if let Err(e) = &result {
            match e.kind {
                ResolutionErrorKind::LockTimeout { .. } => {
                    Counters::bump(&self.counters.lock_timeouts)
                }
                ResolutionErrorKind::FetchFailure(_) => {
                    Counters::bump(&self.counters.fetch_failures)
                }
                _ => {}
            }
        }

        result
    }

    /// Resolve several coordinates concurrently; results keep input order
    pub async fn resolve_all(
        &self,
        coordinates: &[Coordinates],
    ) -> Result<Vec<PathBuf>, ResolutionError> {
        try_join_all(coordinates.iter().map(|c| self.resolve(c))).await
    }

    /// Run `action` while exclusively owning `filename` in `root`.
    ///
    /// Uses this cache's maximum wait and poll interval. Read-only roots
    /// are refused.
    pub async fn with_file_lock<T, E, F, Fut>(
        &self,
        root: &CacheRoot,
        filename: &str,
        coordinates: &Coordinates,
        action: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ResolutionError>,
    {
        if !root.is_writable() {
            return Err(E::from(ResolutionError::io(
                coordinates,
                format!("locking {}", filename),
                io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("cache root {} is read-only", root.path().display()),
                ),
            )));
        }

        let entry_lock = EntryLock::new(root.path(), filename)
            .map_err(|e| E::from(e.into_resolution(coordinates)))?
            .with_max_wait(self.max_lock_wait)
            .with_poll_interval(self.poll_interval)
            .with_holder(self.holder.as_str());

        lock::run_locked(&entry_lock, coordinates, action).await
    }

    /// Search every root; a root that cannot be inspected is an error, not a miss
    async fn search(
        &self,
        coordinates: &Coordinates,
        filename: &str,
    ) -> Result<Option<PathBuf>, ResolutionError> {
        self.roots.find(filename).await.map_err(|e| {
            ResolutionError::io(
                coordinates,
                format!("searching cache roots for {}", filename),
                e,
            )
        })
    }

    async fn fetcher(&self, coordinates: &Coordinates) -> Result<&Arc<dyn Fetcher>, ResolutionError> {
        self.fetcher
            .get_or_try_init(|| async {
                debug!("Creating fetcher");
                (self.fetcher_factory)()
            })
            .await
            .map_err(|e| ResolutionError::fetch(coordinates, e))
    }

    async fn fetch_and_materialize(
        &self,
        root: &CacheRoot,
        filename: &str,
        coordinates: &Coordinates,
    ) -> Result<PathBuf, ResolutionError> {
        let fetcher = self.fetcher(coordinates).await?;

        let bytes = fetcher.fetch(coordinates).await.map_err(|e| {
            warn!("Fetching {} failed: {}", coordinates, e);
            ResolutionError::fetch(coordinates, e)
        })?;

        let path = materialize::write_entry(root.path(), filename, &bytes)
            .await
            .map_err(|e| {
                ResolutionError::io(
                    coordinates,
                    format!("materializing {} in {}", filename, root.path().display()),
                    e,
                )
            })?;

        Counters::bump(&self.counters.fetches);
        info!("Cached {} at {}", coordinates, path.display());
        Ok(path)
    }
}

fn checked_filename(coordinates: &Coordinates) -> Result<String, ResolutionError> {
    let filename = coordinates.filename();
    validate_filename(&filename).map_err(|reason| {
        ResolutionError::new(
            coordinates.clone(),
            ResolutionErrorKind::InvalidFilename {
                name: filename.clone(),
                reason,
            },
        )
    })?;
    Ok(filename)
}
