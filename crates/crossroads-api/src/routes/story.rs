//! Read-only story metadata.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use crossroads_narrative::domain::node::NodeId;
use serde::Serialize;

use crate::state::AppState;

/// Response body for GET /api/v1/story.
#[derive(Debug, Serialize)]
pub struct StoryResponse {
    /// Story title.
    pub title: String,
    /// Node every session starts on.
    pub start: NodeId,
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// SHA-256 digest of the story source.
    pub version_hash: String,
}

/// GET /api/v1/story
async fn get_story(State(state): State<AppState>) -> Json<StoryResponse> {
    let story = &state.story;
    Json(StoryResponse {
        title: story.title().to_owned(),
        start: story.start().clone(),
        node_count: story.len(),
        version_hash: story.version_hash().to_owned(),
    })
}

/// Returns the story metadata router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/story", get(get_story))
}
