//! Integration tests for airplay-ls API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Write operations over form bodies, including the duplicate-play null result
//! - History and chart reads over query strings
//! - Error envelopes for bad arguments, unknown operations and wrong methods

use airplay_common::config::DatabasePoolConfig;
use airplay_ls::{build_router, AppState, Ledger};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over a fresh database; keep the TempDir alive for the test
async fn setup_app() -> (tempfile::TempDir, axum::Router) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ledger = Ledger::open(&dir.path().join("airplay.db"), &DatabasePoolConfig::default())
        .await
        .expect("Should open ledger");
    (dir, build_router(AppState::new(ledger, 40)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: send one request, return status and JSON body
async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

async fn add_play(app: &axum::Router, title: &str, channel: &str, start: &str, end: &str) -> Value {
    let form = format!(
        "title={}&performer=A1&channel={}&start={}&end={}",
        title, channel, start, end
    );
    let (status, body) = send(app, post_form("/add_play", &form)).await;
    assert_eq!(status, StatusCode::OK, "add_play failed: {}", body);
    body
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "airplay-ls");
    assert!(body["version"].is_string());
}

// =============================================================================
// Write Operations
// =============================================================================

#[tokio::test]
async fn test_add_channel_is_idempotent() {
    let (_dir, app) = setup_app().await;

    let (status, first) = send(&app, post_form("/add_channel", "name=Channel+1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["code"], 0);
    assert_eq!(first["result"]["name"], "Channel 1");

    let (_, second) = send(&app, post_form("/add_channel", "name=Channel+1")).await;
    assert_eq!(first["result"]["id"], second["result"]["id"]);
}

#[tokio::test]
async fn test_add_song_returns_performer() {
    let (_dir, app) = setup_app().await;

    let (_, performer) = send(&app, post_form("/add_performer", "name=Artist+1")).await;
    let (status, song) = send(&app, post_form("/add_song", "title=Song+1&performer=Artist+1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(song["result"]["name"], "Song 1");
    assert_eq!(song["result"]["performer"]["id"], performer["result"]["id"]);
}

#[tokio::test]
async fn test_add_play_then_duplicate_is_null() {
    let (_dir, app) = setup_app().await;

    let first = add_play(&app, "S1", "C1", "2024-01-08T10:00:00Z", "2024-01-08T11:00:00Z").await;
    assert_eq!(first["code"], 0);
    assert_eq!(first["result"]["channel"]["name"], "C1");
    assert_eq!(first["result"]["song"]["name"], "S1");

    let repeated = add_play(&app, "S1", "C1", "2024-01-08T10:00:00Z", "2024-01-08T11:00:00Z").await;
    assert_eq!(repeated["code"], 0);
    assert!(repeated["result"].is_null());
}

#[tokio::test]
async fn test_add_play_bad_timestamp() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(
        &app,
        post_form(
            "/add_play",
            "title=S1&performer=A1&channel=C1&start=yesterday&end=2024-01-08T11:00:00Z",
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["errors"][0].is_string());
}

#[tokio::test]
async fn test_add_play_missing_field() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, post_form("/add_play", "title=S1&performer=A1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_add_play_inverted_interval() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(
        &app,
        post_form(
            "/add_play",
            "title=S1&performer=A1&channel=C1&start=2024-01-08T11:00:00Z&end=2024-01-08T10:00:00Z",
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

// =============================================================================
// Read Operations
// =============================================================================

#[tokio::test]
async fn test_get_channel_plays() {
    let (_dir, app) = setup_app().await;
    add_play(&app, "Late", "C1", "2024-01-08T12:00:00Z", "2024-01-08T12:03:00Z").await;
    add_play(&app, "Early", "C1", "2024-01-08T10:00:00Z", "2024-01-08T10:03:00Z").await;
    add_play(&app, "Other", "C2", "2024-01-08T11:00:00Z", "2024-01-08T11:03:00Z").await;

    let (status, body) = send(
        &app,
        get("/get_channel_plays?channel=C1&start=2024-01-08T00:00:00Z&end=2024-01-09T00:00:00Z"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let plays = body["result"].as_array().expect("result should be an array");
    assert_eq!(plays.len(), 2);
    assert_eq!(plays[0]["title"], "Early");
    assert_eq!(plays[0]["performer"], "A1");
    assert_eq!(plays[1]["title"], "Late");
    assert!(plays[0]["start"].as_str().unwrap().starts_with("2024-01-08T10:00:00"));
}

#[tokio::test]
async fn test_get_song_plays() {
    let (_dir, app) = setup_app().await;
    add_play(&app, "S1", "C1", "2024-01-08T10:00:00Z", "2024-01-08T10:03:00Z").await;
    add_play(&app, "S1", "C2", "2024-01-08T11:00:00Z", "2024-01-08T11:03:00Z").await;

    let (status, body) = send(
        &app,
        get("/get_song_plays?title=S1&performer=A1&start=2024-01-08T00:00:00Z&end=2024-01-09T00:00:00Z"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let plays = body["result"].as_array().unwrap();
    assert_eq!(plays.len(), 2);
    assert_eq!(plays[0]["channel"], "C1");
    assert_eq!(plays[1]["channel"], "C2");
}

#[tokio::test]
async fn test_get_song_plays_unknown_song_is_empty() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(
        &app,
        get("/get_song_plays?title=Nothing&performer=Nobody&start=2024-01-08T00:00:00Z&end=2024-01-09T00:00:00Z"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], serde_json::json!([]));
}

#[tokio::test]
async fn test_get_top() {
    let (_dir, app) = setup_app().await;
    add_play(&app, "S1", "C1", "2024-01-08T10:00:00Z", "2024-01-08T11:00:00Z").await;
    add_play(&app, "S1", "C1", "2024-01-09T10:00:00Z", "2024-01-09T11:00:00Z").await;
    add_play(&app, "S2", "C1", "2024-01-02T10:00:00Z", "2024-01-02T11:00:00Z").await;

    // channels=["C1"]
    let (status, body) = send(
        &app,
        get("/get_top?channels=%5B%22C1%22%5D&start=2024-01-08T00:00:00Z&limit=10"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    let chart = body["result"].as_array().unwrap();
    assert_eq!(chart.len(), 1);
    assert_eq!(chart[0]["title"], "S1");
    assert_eq!(chart[0]["performer"], "A1");
    assert_eq!(chart[0]["plays"], 2);
    assert_eq!(chart[0]["rank"], 0);
    assert!(chart[0]["previous_plays"].is_null());
    assert!(chart[0]["previous_rank"].is_null());
}

#[tokio::test]
async fn test_get_top_default_limit_and_empty_channels() {
    let (_dir, app) = setup_app().await;
    add_play(&app, "S1", "C1", "2024-01-08T10:00:00Z", "2024-01-08T11:00:00Z").await;

    let (status, body) = send(
        &app,
        get("/get_top?channels=%5B%22C1%22%5D&start=2024-01-08T00:00:00Z"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"].as_array().unwrap().len(), 1);

    // channels=[]
    let (status, body) = send(&app, get("/get_top?channels=%5B%5D&start=2024-01-08T00:00:00Z")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], serde_json::json!([]));
}

#[tokio::test]
async fn test_get_top_malformed_channels() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, get("/get_top?channels=C1&start=2024-01-08T00:00:00Z")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_get_top_zero_limit() {
    let (_dir, app) = setup_app().await;

    let (status, _) = send(
        &app,
        get("/get_top?channels=%5B%22C1%22%5D&start=2024-01-08T00:00:00Z&limit=0"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_unknown_operation() {
    let (_dir, app) = setup_app().await;

    let (status, body) = send(&app, get("/remove_channel")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert!(body["errors"][0].as_str().unwrap().contains("remove_channel"));
}

#[tokio::test]
async fn test_wrong_method() {
    let (_dir, app) = setup_app().await;

    let response = app.clone().oneshot(get("/add_channel?name=C1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app
        .oneshot(post_form("/get_top", "channels=%5B%5D&start=2024-01-08"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
