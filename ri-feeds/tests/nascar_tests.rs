//! Integration tests for the NascarFeed HTTP source
//!
//! Runs against a local wiremock server standing in for the live feed.

use ri_core::source::{FeedError, FeedSource};
use ri_feeds::NascarFeed;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_PATH: &str = "/live/feeds/live-feed.json";

async fn feed_for(server: &MockServer, timeout: Duration) -> NascarFeed {
    NascarFeed::with_url(format!("{}{}", server.uri(), FEED_PATH), timeout)
        .expect("client should build")
}

#[tokio::test]
async fn test_fetch_decodes_live_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "lap_number": 42,
                "elapsed_time": 2710,
                "time_of_day_os": "2024-02-18T15:12:00-05:00",
                "flag_state": 1,
                "run_name": "Daytona 500",
                "track_name": "Daytona International Speedway",
                "laps_in_race": 200,
                "laps_to_go": 158,
                "vehicles": []
            }"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let feed = feed_for(&server, Duration::from_secs(5)).await;
    let snapshot = feed
        .fetch_live_snapshot(&CancellationToken::new())
        .await
        .expect("fetch should succeed");

    assert_eq!(snapshot.lap_number, Some(42));
    assert_eq!(snapshot.elapsed_time, Some(2710));
    assert_eq!(snapshot.run_name(), Some("Daytona 500"));
    assert_eq!(snapshot.laps_to_go(), Some(158));
    assert!(snapshot.extra.contains_key("vehicles"));
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let feed = feed_for(&server, Duration::from_secs(5)).await;
    let result = feed.fetch_live_snapshot(&CancellationToken::new()).await;

    assert!(matches!(result, Err(FeedError::Status(503))), "{:?}", result);
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let feed = feed_for(&server, Duration::from_secs(5)).await;
    let result = feed.fetch_live_snapshot(&CancellationToken::new()).await;

    assert!(matches!(result, Err(FeedError::Decode(_))), "{:?}", result);
}

#[tokio::test]
async fn test_wrongly_typed_counter_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"lap_number": "ten"}"#))
        .mount(&server)
        .await;

    let feed = feed_for(&server, Duration::from_secs(5)).await;
    let result = feed.fetch_live_snapshot(&CancellationToken::new()).await;

    assert!(matches!(result, Err(FeedError::Decode(_))), "{:?}", result);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let feed = feed_for(&server, Duration::from_millis(200)).await;
    let result = feed.fetch_live_snapshot(&CancellationToken::new()).await;

    assert!(matches!(result, Err(FeedError::Timeout(_))), "{:?}", result);
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let feed = feed_for(&server, Duration::from_secs(60)).await;
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let result = feed.fetch_live_snapshot(&cancel).await;

    assert!(matches!(result, Err(FeedError::Cancelled)), "{:?}", result);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_unreachable_host_is_a_request_error() {
    // Nothing listens on port 9 (discard) on loopback in the test environment
    let feed = NascarFeed::with_url("http://127.0.0.1:9/live-feed.json", Duration::from_secs(2))
        .expect("client should build");
    let result = feed.fetch_live_snapshot(&CancellationToken::new()).await;

    assert!(
        matches!(result, Err(FeedError::Request(_)) | Err(FeedError::Timeout(_))),
        "{:?}",
        result
    );
}
