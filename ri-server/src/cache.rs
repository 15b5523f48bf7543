//! Latest-snapshot cache
//!
//! Single writer (the poller), any number of readers (API handlers). The
//! whole entry is swapped under the write lock, so a reader never sees the
//! snapshot of one cycle paired with the state of another.

use chrono::{DateTime, Utc};
use ri_core::model::{ActivityState, CacheEntry, FeedSnapshot};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the most recent cache entry
#[derive(Clone, Default)]
pub struct Cache {
    entry: Arc<RwLock<CacheEntry>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored entry, stamped with the current time
    pub async fn publish(&self, snapshot: FeedSnapshot, state: ActivityState) {
        self.publish_at(snapshot, state, Utc::now()).await;
    }

    pub async fn publish_at(
        &self,
        snapshot: FeedSnapshot,
        state: ActivityState,
        updated_at: DateTime<Utc>,
    ) {
        // Build outside the lock; the critical section is just the swap
        let next = CacheEntry::new(snapshot, state, updated_at);
        let mut entry = self.entry.write().await;
        *entry = next;
    }

    /// Current entry; empty until the first successful cycle
    pub async fn latest(&self) -> CacheEntry {
        self.entry.read().await.clone()
    }
}
