//! Feed source trait definition

use crate::model::FeedSnapshot;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a fetch produced no snapshot
///
/// The poller treats every variant the same way (no snapshot this cycle);
/// the distinction only matters for logs.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("malformed feed payload: {0}")]
    Decode(String),

    #[error("feed did not respond within {0:?}")]
    Timeout(Duration),

    #[error("fetch cancelled")]
    Cancelled,
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

/// Trait for live-timing feed sources
///
/// Implementations decide how a snapshot is obtained (HTTP, scripted, ...).
/// The detector never sees anything but the resulting snapshot.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Get the name of this source (e.g., "NASCAR", "Demo")
    fn name(&self) -> &str;

    /// Fetch the current live snapshot
    ///
    /// Must return promptly with `FeedError::Cancelled` once `cancel` fires.
    async fn fetch_live_snapshot(
        &self,
        cancel: &CancellationToken,
    ) -> Result<FeedSnapshot, FeedError>;
}
