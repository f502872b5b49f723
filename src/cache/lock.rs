//! Per-entry cross-process locking
//!
//! An entry lock is a file at `<root>/.locks/<filename>.lock` created with
//! `create_new` (`O_CREAT | O_EXCL`). Whoever creates the file owns the
//! entry until the file is removed, so independent processes sharing a
//! cache root exclude each other without any in-memory coordination.
//!
//! Waiters poll for the file to disappear, bounded by a maximum wait. A
//! stuck holder is never broken; waiters time out instead.
//!
//! The lock file carries a small JSON [`LockInfo`] for diagnostics only.

use crate::coordinates::{validate_filename, Coordinates};
use crate::error::{ResolutionError, ResolutionErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Directory inside a cache root holding lock files
pub const LOCKS_DIR: &str = ".locks";

/// Lock file suffix
const LOCK_SUFFIX: &str = ".lock";

/// Default first poll interval while waiting for a busy lock
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound of the poll backoff
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Who holds a lock and since when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Opaque identity of the holding cache instance
    pub holder: String,
    /// OS process id of the holder
    pub pid: u32,
    /// When the lock file was created
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock info for the current process
    pub fn current(holder: &str) -> Self {
        Self {
            holder: holder.to_string(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (pid {}) since {}",
            self.holder,
            self.pid,
            self.acquired_at.to_rfc3339()
        )
    }
}

/// Why a lock could not be acquired
#[derive(Debug)]
pub enum LockError {
    /// The lock stayed busy for the whole wait
    Timeout {
        path: PathBuf,
        waited: Duration,
        holder: Option<LockInfo>,
    },
    /// The lock file could not be created or inspected
    Io { path: PathBuf, source: io::Error },
    /// The entry name would place the lock outside the root
    InvalidFilename { name: String, reason: String },
}

impl LockError {
    /// Attach the coordinates being resolved
    pub fn into_resolution(self, coordinates: &Coordinates) -> ResolutionError {
        match self {
            Self::Timeout {
                path,
                waited,
                holder,
            } => ResolutionError::new(
                coordinates.clone(),
                ResolutionErrorKind::LockTimeout {
                    path,
                    waited,
                    holder,
                },
            ),
            Self::Io { path, source } => ResolutionError::io(
                coordinates,
                format!("locking {}", path.display()),
                source,
            ),
            Self::InvalidFilename { name, reason } => ResolutionError::new(
                coordinates.clone(),
                ResolutionErrorKind::InvalidFilename { name, reason },
            ),
        }
    }
}

/// Exclusive-acquisition primitive for one (root, filename) pair
#[derive(Debug, Clone)]
pub struct EntryLock {
    path: PathBuf,
    max_wait: Duration,
    poll_interval: Duration,
    holder: String,
}

impl EntryLock {
    /// Lock for `filename` inside `root`.
    ///
    /// `filename` must be a plain entry name; anything that could resolve
    /// outside `root` is rejected before a path is built.
    pub fn new(root: &Path, filename: &str) -> Result<Self, LockError> {
        validate_filename(filename).map_err(|reason| LockError::InvalidFilename {
            name: filename.to_string(),
            reason,
        })?;

        Ok(Self {
            path: lock_path(root, filename),
            max_wait: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            holder: format!("pid-{}", std::process::id()),
        })
    }

    /// Total time `acquire` may spend waiting for a busy lock
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// First poll interval; doubles on every retry up to 50ms
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Identity recorded in the lock file
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Single acquisition attempt
    pub async fn try_acquire(&self) -> Result<Option<EntryLockGuard>, LockError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| LockError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        // No await between creating the file and arming its guard: a dropped
        // caller must never leave an unowned lock file.
        let file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
            Err(source) => {
                return Err(LockError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let guard = EntryLockGuard {
            path: self.path.clone(),
            armed: true,
        };

        let file = fs::File::from_std(file);
        if let Err(e) = write_info(file, &LockInfo::current(&self.holder)).await {
            warn!("Could not record holder in {}: {}", self.path.display(), e);
        }

        Ok(Some(guard))
    }

    /// Acquire the lock, polling until `max_wait` has elapsed
    pub async fn acquire(&self) -> Result<EntryLockGuard, LockError> {
        let started = Instant::now();
        let deadline = started + self.max_wait;
        let mut interval = self.poll_interval;

        loop {
            if let Some(guard) = self.try_acquire().await? {
                debug!(
                    "Acquired {} after {:?}",
                    self.path.display(),
                    started.elapsed()
                );
                return Ok(guard);
            }

            let now = Instant::now();
            if now >= deadline {
                let holder = self.holder_info().await;
                warn!(
                    "Gave up on {} after {:?}",
                    self.path.display(),
                    started.elapsed()
                );
                return Err(LockError::Timeout {
                    path: self.path.clone(),
                    waited: started.elapsed(),
                    holder,
                });
            }

            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(MAX_POLL_INTERVAL.max(self.poll_interval));
        }
    }

    /// Current holder, if the lock is held and its info is readable
    pub async fn holder_info(&self) -> Option<LockInfo> {
        read_info(&self.path).await
    }
}

/// Proof of lock ownership; releases on drop
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct EntryLockGuard {
    path: PathBuf,
    armed: bool,
}

impl EntryLockGuard {
    /// Path of the held lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock
    pub async fn release(mut self) -> io::Result<()> {
        self.armed = false;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Released {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for EntryLockGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Reached on error unwinding and when the owning future is cancelled.
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Released {} on drop", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to release {}: {}", self.path.display(), e),
        }
    }
}

/// Run `action` while exclusively owning `(root, filename)`.
///
/// Waits at most `max_wait` for a busy lock, then fails with a lock timeout
/// for `coordinates`. The lock is released on every exit from `action`,
/// including cancellation; an error returned by `action` is passed through
/// unchanged.
pub async fn with_file_lock<T, E, F, Fut>(
    root: &Path,
    filename: &str,
    coordinates: &Coordinates,
    max_wait: Duration,
    action: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<ResolutionError>,
{
    let lock = EntryLock::new(root, filename)
        .map_err(|e| E::from(e.into_resolution(coordinates)))?
        .with_max_wait(max_wait);
    run_locked(&lock, coordinates, action).await
}

/// [`with_file_lock`] for an already configured lock
pub(crate) async fn run_locked<T, E, F, Fut>(
    lock: &EntryLock,
    coordinates: &Coordinates,
    action: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<ResolutionError>,
{
    let guard = lock
        .acquire()
        .await
        .map_err(|e| E::from(e.into_resolution(coordinates)))?;

    let result = action().await;

    if let Err(e) = guard.release().await {
        // The action's outcome takes precedence over a failed release.
        if result.is_ok() {
            return Err(E::from(ResolutionError::io(
                coordinates,
                format!("releasing {}", lock.path().display()),
                e,
            )));
        }
        warn!("Failed to release {}: {}", lock.path().display(), e);
    }

    result
}

/// Lock files currently present under `root`, with their holders
pub async fn held_locks(root: &Path) -> io::Result<Vec<(String, Option<LockInfo>)>> {
    let dir = root.join(LOCKS_DIR);
    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut locks = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(filename) = name.strip_suffix(LOCK_SUFFIX) {
            let info = read_info(&entry.path()).await;
            locks.push((filename.to_string(), info));
        }
    }

    locks.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(locks)
}

fn lock_path(root: &Path, filename: &str) -> PathBuf {
    root.join(LOCKS_DIR)
        .join(format!("{}{}", filename, LOCK_SUFFIX))
}

async fn write_info(mut file: fs::File, info: &LockInfo) -> io::Result<()> {
    let body = serde_json::to_vec(info).map_err(io::Error::other)?;
    file.write_all(&body).await?;
    file.flush().await
}

async fn read_info(path: &Path) -> Option<LockInfo> {
    let content = fs::read(path).await.ok()?;
    serde_json::from_slice(&content).ok()
}
