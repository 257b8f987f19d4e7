//! Crossroads — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crossroads_core::error::SessionError;
use crossroads_narrative::error::NarrativeError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The story file could not be loaded.
    #[error("story error: {0}")]
    Story(#[from] NarrativeError),

    /// Tracing or span export could not be set up.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always `false`, mirroring the `success` flag of accepted requests.
    pub success: bool,
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Participants still outstanding, for quorum conditions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

impl ErrorBody {
    /// A rejection that is not a coordinator condition.
    #[must_use]
    pub fn new(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error,
            message: message.into(),
            missing: Vec::new(),
        }
    }
}

impl From<&SessionError> for ErrorBody {
    fn from(err: &SessionError) -> Self {
        Self {
            missing: err.missing_participants().to_vec(),
            ..Self::new(error_code(err), err.to_string())
        }
    }
}

/// Machine-readable code for a coordinator condition.
#[must_use]
pub fn error_code(err: &SessionError) -> &'static str {
    match err {
        SessionError::InvalidChoice { .. } => "invalid_choice",
        SessionError::TerminalNode(_) => "terminal_node",
        SessionError::EmptyQuorum => "empty_quorum",
        SessionError::IncompleteVotes { .. } => "incomplete_votes",
        SessionError::IncompleteReadiness { .. } => "incomplete_readiness",
        SessionError::TieVote { .. } => "tie_vote",
        SessionError::UnknownParticipant(_) => "unknown_participant",
        SessionError::EmptyMessage => "empty_message",
        SessionError::HandshakeRejected(_) => "handshake_rejected",
        SessionError::DanglingTarget(_) => "dangling_target",
        SessionError::Unavailable => "unavailable",
    }
}

fn status_of(err: &SessionError) -> StatusCode {
    match err {
        SessionError::InvalidChoice { .. }
        | SessionError::EmptyMessage
        | SessionError::HandshakeRejected(_) => StatusCode::BAD_REQUEST,
        SessionError::UnknownParticipant(_) => StatusCode::NOT_FOUND,
        SessionError::TerminalNode(_)
        | SessionError::EmptyQuorum
        | SessionError::IncompleteVotes { .. }
        | SessionError::IncompleteReadiness { .. }
        | SessionError::TieVote { .. } => StatusCode::CONFLICT,
        SessionError::DanglingTarget(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// HTTP-layer wrapper around `SessionError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}
