//! Integration tests for the health and story endpoints.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_health_returns_200_with_status_ok() {
    let app = common::build_test_app();

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_story_metadata_is_served() {
    let app = common::build_test_app();

    let (status, json) = common::get_json(app, "/api/v1/story").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Crossroads");
    assert_eq!(json["start"], "fork");
    assert_eq!(json["node_count"], 5);
    assert_eq!(json["version_hash"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::build_test_app();

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/v1/nonexistent")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
