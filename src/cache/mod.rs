//! Multi-root content cache
//!
//! Entries are plain files named after their coordinates, looked up across
//! an ordered list of roots. Misses are materialized into the writable root
//! under a per-entry lock file, so concurrent tasks and independent
//! processes sharing the root never fetch or write the same entry twice.
//!
//! # Resolution
//!
//! | Step | Outcome |
//! |------|---------|
//! | Search all roots | Hit: return path, no lock taken |
//! | Lock entry in writable root | Busy past max wait: lock timeout |
//! | Search again | Another holder finished it: return path |
//! | Fetch, write temp, rename | Return path, or fetch failure |
//!
//! # Layout of a writable root
//!
//! ```text
//! <root>/<filename>                  complete entry
//! <root>/.<filename>.<uuid>.tmp      entry being written
//! <root>/.locks/<filename>.lock      entry lock
//! ```

pub mod lock;
pub mod materialize;
pub mod resolver;
pub mod roots;

pub use lock::{held_locks, with_file_lock, EntryLock, EntryLockGuard, LockError, LockInfo};
pub use resolver::{CacheStats, CodeCache};
pub use roots::{CacheRoot, CacheRootSet};
