//! Content fetching
//!
//! The cache never talks to the network itself. On a miss it asks a
//! [`Fetcher`] for the bytes of an entry; the fetcher is produced lazily by
//! a [`FetcherFactory`] so tests (and embedders) can substitute their own.

mod http;

pub use http::{HttpFetcher, HttpFetcherConfig};

use crate::coordinates::Coordinates;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Retrieves raw content for coordinates on a cache miss
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the complete content of an entry
    async fn fetch(&self, coordinates: &Coordinates) -> Result<Vec<u8>, FetchError>;
}

/// Builds the fetcher the first time a cache miss needs one
pub type FetcherFactory = Box<dyn Fn() -> Result<Arc<dyn Fetcher>, FetchError> + Send + Sync>;

/// Wrap a fetcher constructor into a [`FetcherFactory`]
pub fn factory<F, T>(build: F) -> FetcherFactory
where
    F: Fn() -> Result<T, FetchError> + Send + Sync + 'static,
    T: Fetcher + 'static,
{
    Box::new(move || build().map(|f| Arc::new(f) as Arc<dyn Fetcher>))
}

/// Failures reported by a fetcher
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no remote source for {coordinates}")]
    NotRemote { coordinates: Coordinates },

    #[error("{url} returned HTTP {code}")]
    Status { url: String, code: u16 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },

    #[error("fetcher unavailable: {0}")]
    Client(String),

    #[error("{0}")]
    Other(String),
}
