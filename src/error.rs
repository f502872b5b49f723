//! Error types for codecache
//!
//! Resolution failures surface as [`ResolutionError`]; everything around it
//! (configuration, CLI, construction) uses `CacheResult<T>`.

use crate::cache::lock::LockInfo;
use crate::coordinates::Coordinates;
use crate::fetch::FetchError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for codecache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A cache lookup or fetch could not complete.
///
/// Means "busy or failed", never "definitely absent".
#[derive(Error, Debug)]
#[error("Failed to resolve {coordinates}: {kind}")]
pub struct ResolutionError {
    /// What was being resolved
    pub coordinates: Coordinates,
    /// Why it failed
    pub kind: ResolutionErrorKind,
}

/// Classification of resolution failures
#[derive(Error, Debug)]
pub enum ResolutionErrorKind {
    #[error("lock {path} not acquired within {waited:?}{}", holder_suffix(.holder))]
    LockTimeout {
        path: PathBuf,
        waited: Duration,
        holder: Option<LockInfo>,
    },

    #[error("fetch failed: {0}")]
    FetchFailure(#[source] FetchError),

    #[error("invalid file name '{name}': {reason}")]
    InvalidFilename { name: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn holder_suffix(holder: &Option<LockInfo>) -> String {
    match holder {
        Some(info) => format!(" (held by {})", info),
        None => String::new(),
    }
}

impl ResolutionError {
    pub fn new(coordinates: Coordinates, kind: ResolutionErrorKind) -> Self {
        Self { coordinates, kind }
    }

    /// Wrap a fetcher failure
    pub fn fetch(coordinates: &Coordinates, source: FetchError) -> Self {
        Self::new(coordinates.clone(), ResolutionErrorKind::FetchFailure(source))
    }

    /// Wrap an IO failure with context
    pub fn io(
        coordinates: &Coordinates,
        context: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::new(
            coordinates.clone(),
            ResolutionErrorKind::Io {
                context: context.into(),
                source,
            },
        )
    }

    /// Whether this failure was a lock wait that ran out of time
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self.kind, ResolutionErrorKind::LockTimeout { .. })
    }

    /// Lock timeouts are transient; everything else needs attention
    pub fn is_retryable(&self) -> bool {
        self.is_lock_timeout()
    }
}

/// All errors that can occur in codecache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    // Cache layout errors
    #[error("No cache roots configured")]
    NoRoots,

    #[error("No writable cache root configured")]
    NoWritableRoot,

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Resolution(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Resolution(e) => match e.kind {
                ResolutionErrorKind::LockTimeout { .. } => Some(
                    "Another process is materializing this entry. Retry later or inspect with: codecache locks",
                ),
                ResolutionErrorKind::FetchFailure(FetchError::NotRemote { .. }) => {
                    Some("Local coordinates must already exist in one of the cache roots")
                }
                _ => None,
            },
            Self::NoRoots | Self::NoWritableRoot => {
                Some("Add a [[cache.roots]] entry with writable = true to the config")
            }
            Self::ConfigInvalid { .. } => Some("Run: codecache config init --force"),
            _ => None,
        }
    }
}
