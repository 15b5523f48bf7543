//! REST API routes

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use ri_core::model::ActivityState;
use serde_json::json;
use tower_http::cors::CorsLayer;

const WAITING_MESSAGE: &str = "No live data available yet. Either no race is active or the first poll hasn't completed. Please check back shortly.";

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/nascar/live", get(live_feed))
        .route("/api/nascar/status", get(poll_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

// === Live Feed Endpoint ===

async fn live_feed(State(state): State<AppState>) -> Json<serde_json::Value> {
    let entry = state.cache.latest().await;

    match entry.snapshot {
        None => Json(json!({
            "status": "waiting",
            "state": entry.state,
            "message": WAITING_MESSAGE,
        })),
        Some(snapshot) => Json(json!({
            "status": "live",
            "state": entry.state,
            "lastUpdatedAt": entry.last_updated_at,
            "data": snapshot,
        })),
    }
}

// === Detector Diagnostics Endpoint ===

async fn poll_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.poll_status().await {
        Some(status) => Json(json!(status)),
        None => Json(json!({
            "source": null,
            "state": ActivityState::Unknown,
            "reason": null,
            "lastCheckedAt": null,
            "nextCheckAt": null,
        })),
    }
}
