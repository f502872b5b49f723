//! Ordered cache roots
//!
//! Roots are searched in the order given. Read-only roots are only ever
//! searched; the first writable root is where misses are locked and
//! materialized.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// A directory participating in the cache search path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRoot {
    /// Directory holding entries
    pub path: PathBuf,

    /// Whether misses may be materialized here
    #[serde(default)]
    pub writable: bool,
}

impl CacheRoot {
    /// A root that accepts new entries
    pub fn writable(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writable: true,
        }
    }

    /// A root that is only searched
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writable: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Where the entry for `filename` lives in this root
    pub fn entry_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }

    /// The complete entry for `filename`, if present.
    ///
    /// Entries only ever appear through an atomic rename, so an existing
    /// regular file is a complete one. Only `NotFound` means absent; any
    /// other failure to inspect the root is returned.
    pub async fn find(&self, filename: &str) -> io::Result<Option<PathBuf>> {
        let path = self.entry_path(filename);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Search order plus the single write destination
#[derive(Debug, Clone)]
pub struct CacheRootSet {
    roots: Vec<CacheRoot>,
    writable: usize,
}

impl CacheRootSet {
    /// Build a root set.
    ///
    /// Rejects an empty list and a list without a writable root. With
    /// several writable roots the first one in search order wins.
    pub fn new(roots: Vec<CacheRoot>) -> CacheResult<Self> {
        if roots.is_empty() {
            return Err(CacheError::NoRoots);
        }

        let writable = roots
            .iter()
            .position(CacheRoot::is_writable)
            .ok_or(CacheError::NoWritableRoot)?;

        let extra = roots.iter().filter(|r| r.writable).count() - 1;
        if extra > 0 {
            warn!(
                "{} additional writable root(s) ignored for writes; using {}",
                extra,
                roots[writable].path.display()
            );
        }

        Ok(Self { roots, writable })
    }

    /// Roots in search order
    pub fn iter(&self) -> impl Iterator<Item = &CacheRoot> {
        self.roots.iter()
    }

    /// The lock and materialization target
    pub fn writable_root(&self) -> &CacheRoot {
        &self.roots[self.writable]
    }

    /// First complete entry for `filename` in search order.
    ///
    /// Stops at the first root that cannot be inspected.
    pub async fn find(&self, filename: &str) -> io::Result<Option<PathBuf>> {
        for root in &self.roots {
            let found = root.find(filename).await.map_err(|e| {
                warn!("Cannot search {}: {}", root.path.display(), e);
                io::Error::new(e.kind(), format!("{}: {}", root.path.display(), e))
            })?;
            if let Some(path) = found {
                debug!("Found {} in {}", filename, root.path.display());
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rejects_empty_roots() {
        assert!(matches!(CacheRootSet::new(vec![]), Err(CacheError::NoRoots)));
    }

    #[test]
    fn rejects_read_only_only() {
        let result = CacheRootSet::new(vec![CacheRoot::read_only("/a"), CacheRoot::read_only("/b")]);
        assert!(matches!(result, Err(CacheError::NoWritableRoot)));
    }

    #[test]
    fn first_writable_root_wins() {
        let set = CacheRootSet::new(vec![
            CacheRoot::read_only("/ro"),
            CacheRoot::writable("/rw1"),
            CacheRoot::writable("/rw2"),
        ])
        .unwrap();

        assert_eq!(set.writable_root().path(), Path::new("/rw1"));
        assert_eq!(set.iter().count(), 3);
    }

    #[tokio::test]
    async fn find_respects_priority() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("a.txt"), "first").unwrap();
        std::fs::write(second.path().join("a.txt"), "second").unwrap();
        std::fs::write(second.path().join("b.txt"), "second").unwrap();

        let set = CacheRootSet::new(vec![
            CacheRoot::read_only(first.path()),
            CacheRoot::writable(second.path()),
        ])
        .unwrap();

        assert_eq!(
            set.find("a.txt").await.unwrap(),
            Some(first.path().join("a.txt"))
        );
        assert_eq!(
            set.find("b.txt").await.unwrap(),
            Some(second.path().join("b.txt"))
        );
        assert_eq!(set.find("c.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn directories_are_not_entries() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("a.txt")).unwrap();

        let root = CacheRoot::writable(temp.path());
        assert_eq!(root.find("a.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_root_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let root = CacheRoot::read_only(temp.path().join("absent"));
        assert_eq!(root.find("a.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn uninspectable_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let blocked = temp.path().join("blocked");
        std::fs::write(&blocked, "").unwrap();
        let fallback = TempDir::new().unwrap();
        std::fs::write(fallback.path().join("a.txt"), "later").unwrap();

        assert!(CacheRoot::read_only(&blocked).find("a.txt").await.is_err());

        // A later root holding the entry does not mask the failure.
        let set = CacheRootSet::new(vec![
            CacheRoot::read_only(&blocked),
            CacheRoot::writable(fallback.path()),
        ])
        .unwrap();
        let err = set.find("a.txt").await.unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }

    #[test]
    fn root_deserializes_read_only_by_default() {
        let root: CacheRoot = toml::from_str("path = \"/data\"").unwrap();
        assert!(!root.is_writable());
    }
}
