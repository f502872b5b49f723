//! HTTP(S) fetcher backed by a blocking `ureq` agent

use super::{FetchError, Fetcher};
use crate::config::schema::FetchConfig;
use crate::coordinates::Coordinates;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

/// Settings for [`HttpFetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Base URL artifact coordinates are resolved against
    pub repository_url: String,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Largest accepted response body
    pub max_bytes: u64,
}

impl From<&FetchConfig> for HttpFetcherConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            repository_url: config.repository_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_bytes: config.max_bytes,
        }
    }
}

/// Downloads URL and artifact coordinates
pub struct HttpFetcher {
    agent: Agent,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    /// Create a fetcher with its own connection pool
    pub fn new(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        if !config.repository_url.starts_with("http://")
            && !config.repository_url.starts_with("https://")
        {
            return Err(FetchError::Client(format!(
                "repository URL must be http(s): {}",
                config.repository_url
            )));
        }

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build()
            .into();

        Ok(Self { agent, config })
    }

    /// URL the content for these coordinates is downloaded from
    pub fn url_for(&self, coordinates: &Coordinates) -> Result<String, FetchError> {
        match coordinates {
            Coordinates::Local { .. } => Err(FetchError::NotRemote {
                coordinates: coordinates.clone(),
            }),
            Coordinates::Url { url } => Ok(url.clone()),
            Coordinates::Artifact(a) => Ok(format!(
                "{}/{}",
                self.config.repository_url.trim_end_matches('/'),
                a.repository_path()
            )),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, coordinates: &Coordinates) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(coordinates)?;
        let agent = self.agent.clone();
        let limit = self.config.max_bytes;

        debug!("Downloading {}", url);

        // A dropped future detaches the blocking request; its result is discarded.
        tokio::task::spawn_blocking(move || download(&agent, &url, limit))
            .await
            .map_err(|e| FetchError::Other(format!("download task failed: {}", e)))?
    }
}

fn download(agent: &Agent, url: &str, limit: u64) -> Result<Vec<u8>, FetchError> {
    let mut response = agent.get(url).call().map_err(|e| match e {
        ureq::Error::StatusCode(code) => FetchError::Status {
            url: url.to_string(),
            code,
        },
        other => FetchError::Transport {
            url: url.to_string(),
            reason: other.to_string(),
        },
    })?;

    let bytes = response
        .body_mut()
        .with_config()
        .limit(limit)
        .read_to_vec()
        .map_err(|e| match e {
            ureq::Error::BodyExceedsLimit(_) => FetchError::TooLarge {
                url: url.to_string(),
                limit,
            },
            other => FetchError::Transport {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })?;

    debug!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(HttpFetcherConfig {
            repository_url: "https://repo.example.com/maven2/".to_string(),
            timeout: Duration::from_secs(5),
            max_bytes: 1024,
        })
        .unwrap()
    }

    #[test]
    fn artifact_url_uses_maven_layout() {
        let url = fetcher()
            .url_for(&Coordinates::artifact("org.example", "core", "1.2.0"))
            .unwrap();
        assert_eq!(
            url,
            "https://repo.example.com/maven2/org/example/core/1.2.0/core-1.2.0.jar"
        );
    }

    #[test]
    fn url_coordinates_pass_through() {
        let url = fetcher()
            .url_for(&Coordinates::url("https://example.com/a.zip"))
            .unwrap();
        assert_eq!(url, "https://example.com/a.zip");
    }

    #[tokio::test]
    async fn local_coordinates_are_not_fetched() {
        let err = fetcher()
            .fetch(&Coordinates::local("file.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotRemote { .. }));
    }

    #[test]
    fn rejects_non_http_repository() {
        let result = HttpFetcher::new(HttpFetcherConfig {
            repository_url: "ftp://repo.example.com".to_string(),
            timeout: Duration::from_secs(5),
            max_bytes: 1024,
        });
        assert!(matches!(result, Err(FetchError::Client(_))));
    }
}
