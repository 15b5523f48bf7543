//! Server configuration
//!
//! Read from environment variables, all optional:
//!
//! | Variable                       | Default                      |
//! |--------------------------------|------------------------------|
//! | `RACEINTEL_BIND_ADDR`          | `0.0.0.0:9100`               |
//! | `RACEINTEL_FEED`               | `nascar` (or `demo`)         |
//! | `RACEINTEL_FEED_URL`           | public NASCAR live feed      |
//! | `RACEINTEL_FETCH_TIMEOUT_SECS` | `15`                         |
//!
//! Poll cadence is not configurable; it comes from the detector.

use ri_core::source::{FeedError, FeedSource};
use ri_feeds::{nascar, DemoFeed, NascarFeed};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const BIND_ADDR_VAR: &str = "RACEINTEL_BIND_ADDR";
pub const FEED_VAR: &str = "RACEINTEL_FEED";
pub const FEED_URL_VAR: &str = "RACEINTEL_FEED_URL";
pub const FETCH_TIMEOUT_VAR: &str = "RACEINTEL_FETCH_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which feed source the poller reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Nascar,
    Demo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub feed: FeedKind,
    pub feed_url: String,
    pub fetch_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9100)),
            feed: FeedKind::Nascar,
            feed_url: nascar::LIVE_FEED_URL.to_string(),
            fetch_timeout: nascar::DEFAULT_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (blank values count as unset)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(BIND_ADDR_VAR) {
            config.bind_addr = raw
                .trim()
                .parse()
                .map_err(|e: std::net::AddrParseError| invalid(BIND_ADDR_VAR, &raw, e))?;
        }

        if let Some(raw) = get(FEED_VAR) {
            config.feed = match raw.trim().to_ascii_lowercase().as_str() {
                "nascar" => FeedKind::Nascar,
                "demo" => FeedKind::Demo,
                _ => return Err(invalid(FEED_VAR, &raw, "expected `nascar` or `demo`")),
            };
        }

        if let Some(raw) = get(FEED_URL_VAR) {
            let url = raw.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(FEED_URL_VAR, &raw, "must be an http(s) URL"));
            }
            config.feed_url = url.to_string();
        }

        if let Some(raw) = get(FETCH_TIMEOUT_VAR) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid(FETCH_TIMEOUT_VAR, &raw, e))?;
            if secs == 0 {
                return Err(invalid(FETCH_TIMEOUT_VAR, &raw, "must be greater than zero"));
            }
            config.fetch_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Instantiate the configured feed source
    pub fn feed_source(&self) -> Result<Arc<dyn FeedSource>, FeedError> {
        Ok(match self.feed {
            FeedKind::Nascar => Arc::new(NascarFeed::with_url(
                self.feed_url.clone(),
                self.fetch_timeout,
            )?),
            FeedKind::Demo => Arc::new(DemoFeed::new()),
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr.port(), 9100);
        assert_eq!(config.feed, FeedKind::Nascar);
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            (BIND_ADDR_VAR, "127.0.0.1:8080"),
            (FEED_VAR, "Demo"),
            (FEED_URL_VAR, "http://localhost:9999/feed.json"),
            (FETCH_TIMEOUT_VAR, "5"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.feed, FeedKind::Demo);
        assert_eq!(config.feed_url, "http://localhost:9999/feed.json");
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[(FEED_VAR, "  "), (FETCH_TIMEOUT_VAR, "")]))
            .unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            (BIND_ADDR_VAR, "not-an-addr"),
            (FEED_VAR, "f1"),
            (FEED_URL_VAR, "ftp://example.com/feed"),
            (FETCH_TIMEOUT_VAR, "soon"),
            (FETCH_TIMEOUT_VAR, "0"),
        ];

        for (key, value) in cases {
            let err = ServerConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            let ConfigError::Invalid { key: bad_key, .. } = &err;
            assert_eq!(*bad_key, key, "{}", err);
        }
    }

    #[test]
    fn test_demo_feed_source() {
        let config = ServerConfig {
            feed: FeedKind::Demo,
            ..Default::default()
        };
        assert_eq!(config.feed_source().unwrap().name(), "Demo");
    }
}
