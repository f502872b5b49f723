//! Atomic materialization of cache entries
//!
//! Content is written to a dot-prefixed temporary file next to the entry,
//! synced, then renamed onto the entry name. Readers outside the lock only
//! ever see a missing or a complete entry.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Temporary file that is removed unless persisted
struct PendingFile {
    path: PathBuf,
    persisted: bool,
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary {}: {}", self.path.display(), e),
        }
    }
}

/// Name of a fresh temporary file for `filename`
pub(crate) fn temp_name(filename: &str) -> String {
    format!(".{}.{}.tmp", filename, Uuid::new_v4().simple())
}

/// Write `bytes` as the entry `root/filename`, atomically.
///
/// The temporary file is removed on every failure path, including
/// cancellation of the returned future.
pub async fn write_entry(root: &Path, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let target = root.join(filename);
    let mut pending = PendingFile {
        path: root.join(temp_name(filename)),
        persisted: false,
    };

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&pending.path)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&pending.path, &target).await?;
    pending.persisted = true;

    debug!("Materialized {} ({} bytes)", target.display(), bytes.len());
    Ok(target)
}
