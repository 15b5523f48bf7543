//! Demo feed that simulates a race weekend without network access
//!
//! Runs through the phases a real feed goes through: counters parked at
//! zero before the green flag, elapsed time and laps climbing while the
//! race runs, then the final results frozen in place.
//!
//! `DemoFeed::scripted` replays an explicit sequence instead, with `None`
//! entries standing in for failed fetches.

use async_trait::async_trait;
use chrono::{FixedOffset, Offset, Utc};
use ri_core::model::FeedSnapshot;
use ri_core::source::{FeedError, FeedSource};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

// NASCAR flag_state codes
const FLAG_GREEN: i64 = 1;
const FLAG_CHECKERED: i64 = 4;
const FLAG_NOT_ACTIVE: i64 = 9;

/// Shape of the simulated race
#[derive(Debug, Clone, Copy)]
pub struct DemoRace {
    /// Polls served with zeroed counters before the start
    pub pre_race_polls: u64,
    pub laps: i64,
    pub seconds_per_lap: i64,
    /// Laps completed between consecutive polls
    pub laps_per_poll: i64,
    /// Venue offset from UTC in hours
    pub utc_offset_hours: i32,
}

impl Default for DemoRace {
    fn default() -> Self {
        Self {
            pre_race_polls: 4,
            laps: 200,
            seconds_per_lap: 48,
            laps_per_poll: 1,
            utc_offset_hours: -5,
        }
    }
}

impl DemoRace {
    /// Snapshot served on the given zero-based poll
    fn snapshot_for_poll(&self, poll: u64) -> FeedSnapshot {
        let racing_polls = poll.saturating_sub(self.pre_race_polls) as i64;
        let lap = (racing_polls * self.laps_per_poll).min(self.laps);
        let elapsed = lap * self.seconds_per_lap;

        let flag = if poll < self.pre_race_polls {
            FLAG_NOT_ACTIVE
        } else if lap >= self.laps {
            FLAG_CHECKERED
        } else {
            FLAG_GREEN
        };

        FeedSnapshot::new(Some(elapsed), Some(lap))
            .with_time_of_day(self.local_time())
            .with_extra("run_name", json!("Demo 500"))
            .with_extra("track_name", json!("Demo International Speedway"))
            .with_extra("run_type", json!(3))
            .with_extra("flag_state", json!(flag))
            .with_extra("laps_in_race", json!(self.laps))
            .with_extra("laps_to_go", json!(self.laps - lap))
    }

    fn local_time(&self) -> String {
        let offset = FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix());
        Utc::now().with_timezone(&offset).to_rfc3339()
    }
}

enum Script {
    Race { race: DemoRace, poll: u64 },
    Steps { remaining: VecDeque<Option<FeedSnapshot>>, last: Option<FeedSnapshot> },
}

/// Offline feed source
pub struct DemoFeed {
    script: Mutex<Script>,
}

impl DemoFeed {
    /// Simulated race with default pacing
    pub fn new() -> Self {
        Self::race(DemoRace::default())
    }

    pub fn race(race: DemoRace) -> Self {
        Self {
            script: Mutex::new(Script::Race { race, poll: 0 }),
        }
    }

    /// Serve `steps` in order; `None` fails that fetch.
    ///
    /// Once exhausted the last successful snapshot is served forever (or a
    /// failure, if there never was one).
    pub fn scripted(steps: impl IntoIterator<Item = Option<FeedSnapshot>>) -> Self {
        Self {
            script: Mutex::new(Script::Steps {
                remaining: steps.into_iter().collect(),
                last: None,
            }),
        }
    }

    fn next_snapshot(&self) -> Result<FeedSnapshot, FeedError> {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);

        match &mut *script {
            Script::Race { race, poll } => {
                let snapshot = race.snapshot_for_poll(*poll);
                *poll += 1;
                Ok(snapshot)
            }
            Script::Steps { remaining, last } => match remaining.pop_front() {
                Some(Some(snapshot)) => {
                    *last = Some(snapshot.clone());
                    Ok(snapshot)
                }
                Some(None) => Err(FeedError::Request("scripted failure".to_string())),
                None => last
                    .clone()
                    .ok_or_else(|| FeedError::Request("script exhausted".to_string())),
            },
        }
    }
}

impl Default for DemoFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for DemoFeed {
    fn name(&self) -> &str {
        "Demo"
    }

    async fn fetch_live_snapshot(
        &self,
        cancel: &CancellationToken,
    ) -> Result<FeedSnapshot, FeedError> {
        if cancel.is_cancelled() {
            return Err(FeedError::Cancelled);
        }
        self.next_snapshot()
    }
}
