//! Adaptive live feed poller
//!
//! This module handles:
//! - Fetching snapshots from the configured feed source
//! - Classifying each snapshot with the activity detector
//! - Publishing classified snapshots into the cache
//! - Sleeping for the detector's recommended delay
//!
//! Both the fetch and the sleep race the cancellation token, so shutdown
//! never waits out a ten-minute backoff or a hung connection.

use crate::state::{AppState, PollStatus};
use chrono::{TimeDelta, Utc};
use ri_core::detector::ActivityDetector;
use ri_core::model::{ActivityState, DetectionResult, FeedSnapshot};
use ri_core::source::{FeedError, FeedSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on a single fetch when none is configured
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Background poll loop; the only writer to the cache
pub struct Poller {
    source: Arc<dyn FeedSource>,
    detector: ActivityDetector,
    state: AppState,
    fetch_timeout: Duration,
    last_state: Option<ActivityState>,
}

impl Poller {
    pub fn new(source: Arc<dyn FeedSource>, state: AppState) -> Self {
        Self {
            source,
            detector: ActivityDetector::new(),
            state,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            last_state: None,
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Main poll loop; returns once `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "{} polling started (gated by live race detector)",
            self.source.name()
        );

        while !cancel.is_cancelled() {
            let Some(result) = self.cycle(&cancel).await else {
                break;
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(result.next_delay) => {}
            }
        }

        info!("{} polling stopped", self.source.name());
    }

    /// One fetch/classify/publish pass. `None` if cancelled mid-fetch.
    pub async fn cycle(&mut self, cancel: &CancellationToken) -> Option<DetectionResult> {
        let snapshot = tokio::select! {
            _ = cancel.cancelled() => return None,
            fetched = self.fetch(cancel) => match fetched {
                Ok(snapshot) => Some(snapshot),
                Err(FeedError::Cancelled) => return None,
                Err(e) => {
                    debug!("{} fetch failed: {}", self.source.name(), e);
                    None
                }
            },
        };

        let result = self.detector.classify(snapshot);

        // Unknown carries no snapshot: keep serving the last good one
        if let Some(snapshot) = &result.snapshot {
            self.state.cache.publish(snapshot.clone(), result.state).await;
        }

        self.log_cycle(&result);
        self.record_status(&result).await;

        Some(result)
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<FeedSnapshot, FeedError> {
        match timeout(self.fetch_timeout, self.source.fetch_live_snapshot(cancel)).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout(self.fetch_timeout)),
        }
    }

    fn log_cycle(&mut self, result: &DetectionResult) {
        if self.last_state != Some(result.state) {
            match result.state {
                ActivityState::Unknown => warn!(
                    "{} feed unavailable ({}), retrying in {:?}",
                    self.source.name(),
                    result.reason,
                    result.next_delay
                ),
                state => info!(
                    "{} race state now {} ({})",
                    self.source.name(),
                    state,
                    result.reason
                ),
            }
            self.last_state = Some(result.state);
        }

        match &result.snapshot {
            Some(feed) => debug!(
                "{} detector state: {} ({}). Next check in {:?} - {} | Lap {:?}/{:?} | Flag: {:?}",
                self.source.name(),
                result.state,
                result.reason,
                result.next_delay,
                feed.run_name().unwrap_or("-"),
                feed.lap_number,
                feed.laps_in_race(),
                feed.flag_state(),
            ),
            None => debug!(
                "{} detector state: {} ({}). Next check in {:?}",
                self.source.name(),
                result.state,
                result.reason,
                result.next_delay
            ),
        }
    }

    async fn record_status(&self, result: &DetectionResult) {
        let now = Utc::now();
        let delay = TimeDelta::from_std(result.next_delay).unwrap_or_else(|_| TimeDelta::zero());

        self.state
            .set_poll_status(PollStatus {
                source: self.source.name().to_string(),
                state: result.state,
                reason: result.reason.clone(),
                last_checked_at: now,
                next_check_at: now.checked_add_signed(delay).unwrap_or(now),
            })
            .await;
    }
}
