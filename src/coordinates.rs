//! Cache coordinates
//!
//! A `Coordinates` value names a piece of cached content. The same value is
//! used as the lock key, the fetch key and the basis of the entry file name.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Extension used when an artifact coordinate omits one
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "jar";

/// Identifier of a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Coordinates {
    /// Content addressed directly by file name, no remote source implied
    Local { filename: String },

    /// Content downloaded from an absolute http(s) URL
    Url { url: String },

    /// Repository artifact in Maven layout
    Artifact(ArtifactCoordinates),
}

/// `group:name:version[:extension]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactCoordinates {
    pub group: String,
    pub name: String,
    pub version: String,
    pub extension: String,
}

impl ArtifactCoordinates {
    /// Path of the artifact relative to a repository base URL
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}/{}-{}.{}",
            self.group.replace('.', "/"),
            self.name,
            self.version,
            self.name,
            self.version,
            self.extension
        )
    }
}

impl Coordinates {
    /// Coordinates for a file addressed by name
    pub fn local(filename: impl Into<String>) -> Self {
        Self::Local {
            filename: filename.into(),
        }
    }

    /// Coordinates for a remote URL
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    /// Coordinates for a repository artifact
    pub fn artifact(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::Artifact(ArtifactCoordinates {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
        })
    }

    /// Name of the entry file inside a cache root
    ///
    /// The result is not validated here; callers run it through
    /// [`validate_filename`] before touching the filesystem.
    pub fn filename(&self) -> String {
        match self {
            Self::Local { filename } => filename.clone(),
            Self::Url { url } => {
                let digest = Sha256::digest(url.as_bytes());
                let last = url
                    .split(['?', '#'])
                    .next()
                    .and_then(|path| path.rsplit('/').next())
                    .filter(|segment| !segment.is_empty() && !segment.contains(':'))
                    .unwrap_or("download");
                format!("{}-{}", hex::encode(&digest[..6]), last)
            }
            Self::Artifact(a) => {
                format!("{}-{}-{}.{}", a.group, a.name, a.version, a.extension)
            }
        }
    }

    /// Whether content for these coordinates can only come from the cache roots
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { filename } => write!(f, "local:{}", filename),
            Self::Url { url } => write!(f, "{}", url),
            Self::Artifact(a) if a.extension == DEFAULT_ARTIFACT_EXTENSION => {
                write!(f, "{}:{}:{}", a.group, a.name, a.version)
            }
            Self::Artifact(a) => {
                write!(f, "{}:{}:{}:{}", a.group, a.name, a.version, a.extension)
            }
        }
    }
}

impl FromStr for Coordinates {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CacheError::InvalidCoordinates(
                "coordinates cannot be empty".to_string(),
            ));
        }

        if let Some(filename) = s.strip_prefix("local:") {
            return Ok(Self::local(filename));
        }

        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(Self::url(s));
        }

        if !s.contains(':') {
            return Ok(Self::local(s));
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CacheError::InvalidCoordinates(format!(
                "'{}' has an empty component",
                s
            )));
        }

        match parts.as_slice() {
            [group, name, version] => Ok(Self::artifact(*group, *name, *version)),
            [group, name, version, extension] => Ok(Self::Artifact(ArtifactCoordinates {
                group: group.to_string(),
                name: name.to_string(),
                version: version.to_string(),
                extension: extension.to_string(),
            })),
            _ => Err(CacheError::InvalidCoordinates(format!(
                "'{}' is not local:<name>, a URL, or group:name:version[:extension]",
                s
            ))),
        }
    }
}

/// Check that a file name is safe to use inside a cache root.
///
/// Names starting with `.` are reserved for lock and temporary files.
pub fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("file name cannot be empty".to_string());
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") || name.contains('\0') {
        return Err("must not contain path separators or '..'".to_string());
    }
    if name.starts_with('.') {
        return Err("must not start with '.'".to_string());
    }
    Ok(())
}
