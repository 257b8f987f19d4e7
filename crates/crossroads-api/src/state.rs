//! Shared application state.

use std::sync::Arc;

use crossroads_narrative::domain::graph::NarrativeGraph;
use crossroads_session::application::coordinator::SessionHandle;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Client of the session coordinator task.
    pub session: SessionHandle,
    /// The story being played, for read-only metadata.
    pub story: Arc<NarrativeGraph>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(session: SessionHandle, story: Arc<NarrativeGraph>) -> Self {
        Self { session, story }
    }
}
