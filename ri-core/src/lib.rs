//! RaceIntel Core Library
//!
//! This crate provides the live feed data model, the feed source trait and
//! the race activity detector that drives adaptive polling.

pub mod detector;
pub mod model;
pub mod source;

pub use detector::{ActivityDetector, DetectorState, SharedDetector};
pub use model::{ActivityState, CacheEntry, DetectionResult, FeedSnapshot};
pub use source::{FeedError, FeedSource};
