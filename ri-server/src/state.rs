//! Application state management

use crate::cache::Cache;
use chrono::{DateTime, Utc};
use ri_core::model::ActivityState;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Latest published feed snapshot
    pub cache: Cache,

    /// Outcome of the most recent poll cycle (None until the first one)
    pub poll_status: Arc<RwLock<Option<PollStatus>>>,
}

/// Diagnostics from the most recent detection cycle
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStatus {
    pub source: String,
    pub state: ActivityState,
    pub reason: String,
    pub last_checked_at: DateTime<Utc>,
    pub next_check_at: DateTime<Utc>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            cache: Cache::new(),
            poll_status: Arc::new(RwLock::new(None)),
        }
    }

    /// Record the outcome of a poll cycle
    pub async fn set_poll_status(&self, status: PollStatus) {
        let mut current = self.poll_status.write().await;
        *current = Some(status);
    }

    pub async fn poll_status(&self) -> Option<PollStatus> {
        self.poll_status.read().await.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
