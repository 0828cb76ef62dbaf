//! Fetch collaborator: turns a remote locator into binary content

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::data_uri::normalize_mime;
use crate::error::FetchError;
use crate::types::FetchedMedia;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the content behind `locator` along with its MIME type
    async fn fetch(&self, locator: &str) -> Result<FetchedMedia, FetchError>;
}

/// HTTP(S) fetcher built on reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with a per-request timeout
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<FetchedMedia, FetchError> {
        let url = Url::parse(locator)
            .map_err(|e| FetchError::InvalidUrl(format!("{locator}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme {:?} in {locator}",
                url.scheme()
            )));
        }

        debug!(url = %url, "Fetching media");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: locator.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url = %locator, "Media fetch failed");
            return Err(FetchError::Status {
                url: locator.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_type = normalize_mime(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        let content = response.bytes().await.map_err(|e| FetchError::Transport {
            url: locator.to_string(),
            message: e.to_string(),
        })?;

        debug!(
            size = content.len(),
            content_type = %content_type,
            "Fetched media"
        );

        Ok(FetchedMedia {
            content,
            content_type,
        })
    }
}
