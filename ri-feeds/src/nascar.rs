//! NASCAR live feed source
//!
//! Polls the public live-feed JSON over HTTP. Every failure mode (transport,
//! non-success status, undecodable body, timeout) comes back as a
//! `FeedError`; the caller treats them all as "no snapshot".

use async_trait::async_trait;
use ri_core::model::FeedSnapshot;
use ri_core::source::{FeedError, FeedSource};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Public live feed endpoint
pub const LIVE_FEED_URL: &str = "https://cf.nascar.com/live/feeds/live-feed.json";

/// Request timeout when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP-backed feed source
pub struct NascarFeed {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl NascarFeed {
    /// Source for the public live feed with the default timeout
    pub fn new() -> Result<Self, FeedError> {
        Self::with_url(LIVE_FEED_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("raceintel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;

        Ok(FeedSnapshot::from_json(&body)?)
    }

    fn request_error(&self, err: reqwest::Error) -> FeedError {
        if err.is_timeout() {
            FeedError::Timeout(self.timeout)
        } else {
            FeedError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl FeedSource for NascarFeed {
    fn name(&self) -> &str {
        "NASCAR"
    }

    async fn fetch_live_snapshot(
        &self,
        cancel: &CancellationToken,
    ) -> Result<FeedSnapshot, FeedError> {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(FeedError::Cancelled),
            result = self.fetch() => result,
        };

        match &result {
            Err(FeedError::Status(code)) => warn!("NASCAR live feed returned {}", code),
            Err(e) => error!("Failed to fetch NASCAR live feed: {}", e),
            Ok(_) => {}
        }

        result
    }
}
