//! Race activity detection
//!
//! Infers whether a session is pre-race, running, finished, or absent purely
//! from how the feed's progress counters move between polls. The upstream
//! feed has no trustworthy "is live" flag, so liveness is judged on
//! monotonic progress of elapsed time and lap number.
//!
//! Each classification also yields the delay before the next poll: tight
//! while a session is live or about to start, backing off to ten minutes
//! once the feed is clearly idle.

use crate::model::{ActivityState, DetectionResult, FeedSnapshot};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Poll interval while a session is live or about to start
pub const ACTIVE_DELAY: Duration = Duration::from_secs(30);

/// Retry interval after a failed fetch
pub const FETCH_FAILED_DELAY: Duration = Duration::from_secs(2 * 60);

/// Poll interval while the feed is parked on final results
pub const POST_RACE_DELAY: Duration = Duration::from_secs(5 * 60);

/// Poll interval when progress stopped only recently
pub const SHORT_IDLE_DELAY: Duration = Duration::from_secs(5 * 60);

/// Poll interval once the feed is clearly idle
pub const LONG_IDLE_DELAY: Duration = Duration::from_secs(10 * 60);

/// How long counters must stay put before the feed counts as frozen
pub const FROZEN_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Elapsed time (seconds) above which a frozen clock means a finished race
pub const LARGE_ELAPSED_SECS: i64 = 3600;

/// Progress baseline carried between detection cycles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectorState {
    pub last_elapsed: Option<i64>,
    pub last_lap: Option<i64>,

    /// Wall-clock time of the last observed forward progress; `None` = never
    pub last_change_at: Option<DateTime<Utc>>,

    /// Venue-local date on which progress was last observed
    pub race_local_date: Option<NaiveDate>,
}

impl DetectorState {
    fn has_baseline(&self) -> bool {
        self.last_elapsed.is_some() || self.last_lap.is_some()
    }

    fn record_progress(
        &mut self,
        elapsed: Option<i64>,
        lap: Option<i64>,
        local_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) {
        self.last_elapsed = elapsed;
        self.last_lap = lap;
        // never rewinds, even if the wall clock steps backwards
        self.last_change_at = Some(match self.last_change_at {
            Some(prev) if prev > now => prev,
            _ => now,
        });
        if let Some(date) = local_date {
            self.race_local_date = Some(date);
        }
    }

    fn frozen_for(&self, now: DateTime<Utc>) -> Duration {
        match self.last_change_at {
            Some(at) => (now - at).to_std().unwrap_or(Duration::ZERO),
            None => Duration::MAX,
        }
    }
}

/// `current > last`, where an absent value ranks below every present one
fn moved_past(current: Option<i64>, last: Option<i64>) -> bool {
    match (current, last) {
        (Some(current), Some(last)) => current > last,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Classifies feed snapshots into activity states
///
/// Owns its progress baseline for the lifetime of the process; there is no
/// reset. Wrap in [`SharedDetector`] when several callers classify.
#[derive(Debug, Default)]
pub struct ActivityDetector {
    state: DetectorState,
}

impl ActivityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current progress baseline
    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    /// Classify a snapshot observed now. `None` means the fetch failed.
    pub fn classify(&mut self, snapshot: Option<FeedSnapshot>) -> DetectionResult {
        self.classify_at(snapshot, Utc::now())
    }

    /// Classify a snapshot observed at `now`
    pub fn classify_at(
        &mut self,
        snapshot: Option<FeedSnapshot>,
        now: DateTime<Utc>,
    ) -> DetectionResult {
        // A transient outage must not touch the baseline
        let Some(snapshot) = snapshot else {
            return DetectionResult::new(
                ActivityState::Unknown,
                FETCH_FAILED_DELAY,
                None,
                "fetch failed",
            );
        };

        let elapsed = snapshot.elapsed_time;
        let lap = snapshot.lap_number;
        let local_date = snapshot.local_date();

        if !self.state.has_baseline() {
            self.state.record_progress(elapsed, lap, local_date, now);
            debug!(?elapsed, ?lap, ?local_date, "Feed baseline established");

            return if snapshot.is_zeroed() {
                DetectionResult::new(
                    ActivityState::PreRace,
                    ACTIVE_DELAY,
                    Some(snapshot),
                    "baseline at zero counters",
                )
            } else {
                DetectionResult::new(
                    ActivityState::Active,
                    ACTIVE_DELAY,
                    Some(snapshot),
                    "baseline with non-zero counters",
                )
            };
        }

        let advanced =
            moved_past(elapsed, self.state.last_elapsed) || moved_past(lap, self.state.last_lap);

        if advanced {
            self.state.record_progress(elapsed, lap, local_date, now);
            return DetectionResult::new(
                ActivityState::Active,
                ACTIVE_DELAY,
                Some(snapshot),
                "advanced",
            );
        }

        if snapshot.is_zeroed() {
            return DetectionResult::new(
                ActivityState::PreRace,
                ACTIVE_DELAY,
                Some(snapshot),
                "still at zero, no advancement",
            );
        }

        let frozen_for = self.state.frozen_for(now);

        if elapsed.is_some_and(|e| e >= LARGE_ELAPSED_SECS) && frozen_for >= FROZEN_THRESHOLD {
            // Day rollover takes precedence over the post-race hold
            if let Some(date) = local_date {
                let race_date = *self.state.race_local_date.get_or_insert(date);
                if date > race_date {
                    debug!(%race_date, %date, "Venue date moved past race day");
                    return DetectionResult::new(
                        ActivityState::NoRace,
                        LONG_IDLE_DELAY,
                        Some(snapshot),
                        "local race day advanced",
                    );
                }
            }

            return DetectionResult::new(
                ActivityState::PostRace,
                POST_RACE_DELAY,
                Some(snapshot),
                "elapsed frozen at large value",
            );
        }

        if frozen_for < FROZEN_THRESHOLD {
            DetectionResult::new(
                ActivityState::NoRace,
                SHORT_IDLE_DELAY,
                Some(snapshot),
                format!("no advancement, frozen <5m ({}s)", frozen_for.as_secs()),
            )
        } else {
            DetectionResult::new(
                ActivityState::NoRace,
                LONG_IDLE_DELAY,
                Some(snapshot),
                format!(
                    "no advancement, frozen >=5m ({}s), backing off",
                    frozen_for.as_secs()
                ),
            )
        }
    }
}

/// Thread-safe handle to a single detector
#[derive(Debug, Clone, Default)]
pub struct SharedDetector {
    inner: Arc<Mutex<ActivityDetector>>,
}

impl SharedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify under the detector lock; the whole cycle is one critical section
    pub fn classify(&self, snapshot: Option<FeedSnapshot>) -> DetectionResult {
        self.lock().classify(snapshot)
    }

    pub fn classify_at(&self, snapshot: Option<FeedSnapshot>, now: DateTime<Utc>) -> DetectionResult {
        self.lock().classify_at(snapshot, now)
    }

    /// Snapshot of the current baseline
    pub fn state(&self) -> DetectorState {
        self.lock().state().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActivityDetector> {
        // classify never panics mid-update, so a poisoned guard is still consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
