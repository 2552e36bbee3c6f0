//! Image download: one GET per record, bounded by a timeout and a size cap.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{RecordError, RecordResult};

/// A successfully fetched response body.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Raw `Content-Type` header value, if the server sent one
    pub content_type: Option<Vec<u8>>,
}

/// Source of image bytes for a URL.
///
/// Uses `async_trait` so the batch pipeline can hold an `Arc<dyn ImageFetcher>`.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the body at `url`.
    ///
    /// Implementations map every failure onto the network, HTTP status,
    /// empty body or size-cap variants of [`RecordError`].
    async fn fetch(&self, url: &str) -> RecordResult<FetchedImage>;
}

/// Production fetcher backed by a shared `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    max_mb: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            max_bytes: config.max_response_mb * 1024 * 1024,
            max_mb: config.max_response_mb,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> RecordResult<FetchedImage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecordError::HttpStatus(status.as_u16()));
        }

        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(RecordError::TooLarge {
                max_mb: self.max_mb,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .map(|v| v.as_bytes().to_vec());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network_error(&e))?;
            if bytes.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(RecordError::TooLarge {
                    max_mb: self.max_mb,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(RecordError::EmptyResponse);
        }

        tracing::trace!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

/// Flatten a reqwest error and its causes into one report line.
///
/// The top-level message is the same for DNS failures, refused connections
/// and timeouts; the source chain tells them apart.
fn network_error(e: &reqwest::Error) -> RecordError {
    let mut message = if e.is_timeout() {
        format!("request timed out: {e}")
    } else {
        e.to_string()
    };
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    RecordError::Network(message)
}
