//! Configuration schema for codecache
//!
//! Configuration is stored at `~/.config/codecache/config.toml`

use crate::cache::roots::CacheRoot;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache roots and locking behavior
    pub cache: CacheConfig,

    /// Remote fetch settings
    pub fetch: FetchConfig,
}

/// Cache roots and lock timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Longest time a resolution waits for a busy entry, in milliseconds
    pub max_lock_wait_ms: u64,

    /// First poll interval while waiting, in milliseconds
    pub poll_interval_ms: u64,

    /// Roots in search order
    pub roots: Vec<CacheRoot>,
}

impl CacheConfig {
    pub fn max_lock_wait(&self) -> Duration {
        Duration::from_millis(self.max_lock_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Default writable root under the platform cache directory
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("codecache")
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_lock_wait_ms: 30_000,
            poll_interval_ms: 10,
            roots: vec![CacheRoot::writable(Self::default_root())],
        }
    }
}

/// HTTP fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Repository artifact coordinates are resolved against
    pub repository_url: String,

    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Largest accepted download in bytes
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            repository_url: "https://repo.maven.apache.org/maven2".to_string(),
            timeout_secs: 60,
            max_bytes: 256 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.cache.max_lock_wait(), Duration::from_secs(30));
        assert_eq!(config.cache.roots.len(), 1);
        assert!(config.cache.roots[0].writable);
        assert!(config.fetch.repository_url.starts_with("https://"));
    }

    #[test]
    fn parse_roots() {
        let toml = r#"
[cache]
max_lock_wait_ms = 500

[[cache.roots]]
path = "/opt/shared-cache"

[[cache.roots]]
path = "/home/user/.cache/codecache"
writable = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.max_lock_wait(), Duration::from_millis(500));
        assert_eq!(config.cache.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.cache.roots.len(), 2);
        assert!(!config.cache.roots[0].writable);
        assert!(config.cache.roots[1].writable);
        assert_eq!(config.fetch.timeout_secs, 60);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let config: Config = toml::from_str("[cache]\npoll_interval_ms = 0\n").unwrap();
        assert_eq!(config.cache.poll_interval(), Duration::from_millis(1));
    }
}
