//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use crossroads_narrative::domain::graph::NarrativeGraph;
use crossroads_session::application::coordinator::{CoordinatorConfig, SessionCoordinator};
use crossroads_test_support::{FixedClock, crossroads_story};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crossroads_api::state::AppState;

/// Build the full app router over the crossroads fixture story with a fixed
/// clock. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> Router {
    build_test_app_with(crossroads_story())
}

/// Build the full app router over a custom story.
pub fn build_test_app_with(story: NarrativeGraph) -> Router {
    let story = Arc::new(story);
    let (session, _task) = SessionCoordinator::spawn(
        Arc::clone(&story),
        Arc::new(FixedClock::default()),
        CoordinatorConfig::default(),
    );
    crossroads_api::app(AppState::new(session, story))
}

async fn into_json(request: Request<Body>, app: Router) -> (StatusCode, serde_json::Value) {
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

    into_json(request, app).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    into_json(request, app).await
}

/// Send a DELETE request and return the status.
pub async fn delete(app: Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    into_json(request, app).await.0
}

/// Connect `name` and return its connection id.
pub async fn connect(app: &Router, name: &str) -> String {
    let (status, json) = post_json(
        app.clone(),
        "/api/v1/session/connections",
        &serde_json::json!({ "name": name }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "connect {name}: {json}");
    json["connection_id"].as_str().unwrap().to_owned()
}

/// Cast a vote and return the response.
pub async fn vote(app: &Router, name: &str, choice_index: usize) -> (StatusCode, serde_json::Value) {
    post_json(
        app.clone(),
        "/api/v1/session/votes",
        &serde_json::json!({ "participant": name, "choice_index": choice_index }),
    )
    .await
}

/// Request an advance and return the response.
pub async fn advance(app: &Router, name: &str) -> (StatusCode, serde_json::Value) {
    post_json(
        app.clone(),
        "/api/v1/session/advance",
        &serde_json::json!({ "participant": name }),
    )
    .await
}

/// Fetch the session snapshot.
pub async fn snapshot(app: &Router) -> serde_json::Value {
    let (status, json) = get_json(app.clone(), "/api/v1/session/snapshot").await;
    assert_eq!(status, StatusCode::OK);
    json
}
