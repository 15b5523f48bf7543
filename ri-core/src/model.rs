//! Live feed data model
//!
//! Defines the FeedSnapshot payload the detector reads, the ActivityState
//! classification, and the result/cache records built around them.
//!
//! The upstream payload is loosely typed: only the progress markers the
//! detector needs are modeled explicitly. Every other key is carried in
//! `extra` and serialized back out unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One poll of the upstream live-timing feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    /// Running clock in seconds since session start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<i64>,

    /// Current lap count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_number: Option<i64>,

    /// Venue wall-clock time as reported by the feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day_os: Option<String>,

    /// Everything else the feed sends, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FeedSnapshot {
    pub fn new(elapsed_time: Option<i64>, lap_number: Option<i64>) -> Self {
        Self {
            elapsed_time,
            lap_number,
            ..Default::default()
        }
    }

    pub fn with_time_of_day(mut self, time_of_day_os: impl Into<String>) -> Self {
        self.time_of_day_os = Some(time_of_day_os.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Parse a snapshot from the raw feed body
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// Both progress counters are present and zero
    pub fn is_zeroed(&self) -> bool {
        self.elapsed_time == Some(0) && self.lap_number == Some(0)
    }

    /// Calendar date at the venue, if the local time field parses
    ///
    /// Accepts RFC 3339 (`2024-02-18T16:42:13-05:00`) and the same form
    /// without an offset. Anything else counts as absent.
    pub fn local_date(&self) -> Option<NaiveDate> {
        let raw = self.time_of_day_os.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|ts| ts.date())
    }

    pub fn run_name(&self) -> Option<&str> {
        self.extra.get("run_name").and_then(|v| v.as_str())
    }

    pub fn track_name(&self) -> Option<&str> {
        self.extra.get("track_name").and_then(|v| v.as_str())
    }

    pub fn race_id(&self) -> Option<i64> {
        self.extra_int("race_id")
    }

    pub fn flag_state(&self) -> Option<i64> {
        self.extra_int("flag_state")
    }

    pub fn laps_in_race(&self) -> Option<i64> {
        self.extra_int("laps_in_race")
    }

    pub fn laps_to_go(&self) -> Option<i64> {
        self.extra_int("laps_to_go")
    }

    fn extra_int(&self, key: &str) -> Option<i64> {
        self.extra.get(key).and_then(|v| v.as_i64())
    }
}

/// Race activity inferred from how the feed changes over time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityState {
    /// Feed unreachable or unparseable
    #[default]
    Unknown,
    /// Feed reachable, counters parked at zero
    PreRace,
    /// Counters advancing
    Active,
    /// Elapsed time frozen at a large value after the finish
    PostRace,
    /// Feed reachable but nothing is happening
    NoRace,
}

impl ActivityState {
    /// Stable token used in API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityState::Unknown => "unknown",
            ActivityState::PreRace => "pre-race",
            ActivityState::Active => "active",
            ActivityState::PostRace => "post-race",
            ActivityState::NoRace => "no-race",
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one detection cycle
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub state: ActivityState,

    /// How long to wait before polling again
    pub next_delay: Duration,

    /// The snapshot that was classified; `None` only when the fetch failed
    pub snapshot: Option<FeedSnapshot>,

    /// Short diagnostic for logs, not part of the API contract
    pub reason: String,
}

impl DetectionResult {
    pub fn new(
        state: ActivityState,
        next_delay: Duration,
        snapshot: Option<FeedSnapshot>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            state,
            next_delay,
            snapshot,
            reason: reason.into(),
        }
    }
}

/// The most recently published snapshot and its classification
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub snapshot: Option<Arc<FeedSnapshot>>,
    pub state: ActivityState,
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn new(snapshot: FeedSnapshot, state: ActivityState, last_updated_at: DateTime<Utc>) -> Self {
        Self {
            snapshot: Some(Arc::new(snapshot)),
            state,
            last_updated_at: Some(last_updated_at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none()
    }
}
