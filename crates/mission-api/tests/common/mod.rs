//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mission_channels::config::TopologyConfig;
use mission_core::ids::CommunityId;
use mission_core::platform::ChannelKind;
use mission_core::repository::ResourceRepository;
use mission_core::rng::DeterministicRng;
use mission_orchestrator::coordinator::MissionCoordinator;
use mission_test_support::{RecordingPlatform, SequenceRng, SteppingClock};
use tower::ServiceExt;

use mission_api::state::AppState;

pub const COMMUNITY: CommunityId = CommunityId(1_100_000_000_000_000_001);

/// A platform with the event category and control channel in place.
pub fn platform() -> Arc<RecordingPlatform> {
    let platform = Arc::new(RecordingPlatform::new());
    let category = platform.add_channel(COMMUNITY, "Blob Event", ChannelKind::Category, None);
    platform.add_channel(COMMUNITY, "control", ChannelKind::Text, Some(category));
    platform
}

/// Build the full app router over `repo` and `platform`, the same way
/// `main.rs` does, with a stepping clock and a scripted RNG.
pub fn build_test_app(
    repo: Arc<dyn ResourceRepository>,
    platform: Arc<RecordingPlatform>,
    rng: SequenceRng,
) -> Router {
    let clock = SteppingClock::new(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
        chrono::Duration::seconds(1),
    );
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(rng));
    let coordinator = MissionCoordinator::new(
        repo,
        platform,
        Arc::new(clock),
        rng,
        TopologyConfig {
            category_name: Some("Blob Event".into()),
            admin_channel_name: Some("control".into()),
        },
    );
    mission_api::app(AppState::new(Arc::new(coordinator)))
}

pub fn uri(path: &str) -> String {
    format!("/api/v1/communities/{COMMUNITY}{path}")
}

async fn read(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    read(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    read(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    read(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    read(app, request).await
}
