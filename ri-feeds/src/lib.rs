//! Live timing feed sources for RaceIntel

pub mod demo;
pub mod nascar;

pub use demo::{DemoFeed, DemoRace};
pub use nascar::NascarFeed;
