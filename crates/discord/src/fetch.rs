use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("could not build http client: {0}")]
    Client(String),
    #[error("attachment request failed: {0}")]
    Request(String),
    #[error("attachment download returned HTTP {status}")]
    Status { status: u16 },
}

#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Downloads attachments with a plain GET against the CDN URL the platform
/// hands out.
#[derive(Clone)]
pub struct HttpAttachmentFetcher {
    client: Client,
}

impl HttpAttachmentFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| FetchError::Client(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AttachmentFetcher for HttpAttachmentFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| FetchError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16() });
        }

        response.text().await.map_err(|error| FetchError::Request(error.to_string()))
    }
}
