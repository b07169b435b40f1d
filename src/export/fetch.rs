//! Remote image retrieval for embedding.

use async_trait::async_trait;

use crate::config::ExportConfig;
use crate::export::error::{ExportError, ExportResult};

/// Source of image bytes by URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Download one image.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status or when
    /// the body exceeds the byte cap.
    async fn fetch(&self, url: &str) -> ExportResult<Vec<u8>>;
}

/// HTTP fetcher with a per-request timeout and a byte cap.
pub struct HttpImageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpImageFetcher {
    /// Build a fetcher from export settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ExportConfig) -> ExportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.image_timeout)
            .user_agent(concat!("travel-guide/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_bytes: config.max_image_bytes,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> ExportResult<Vec<u8>> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Status(status.as_u16()));
        }

        let limit = self.max_bytes;
        if response
            .content_length()
            .is_some_and(|len| len > limit as u64)
        {
            return Err(ExportError::TooLarge { limit });
        }

        // Content-Length may be absent or wrong; enforce the cap while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(ExportError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}
