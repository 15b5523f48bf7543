//! RaceIntel Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod cache;
pub mod config;
pub mod poller;
pub mod state;
