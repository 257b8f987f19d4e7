//! Routes for the shared story session.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use crossroads_core::error::SessionError;
use crossroads_core::participant::ParticipantId;
use crossroads_narrative::domain::node::NodeId;
use crossroads_session::domain::commands::{
    CastVote, JoinSession, LeaveSession, RequestAdvance, SendChat,
};
use crossroads_session::domain::registry::ConnectionId;
use crossroads_session::domain::snapshot::SessionSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /connections.
#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// Self-declared display name.
    pub name: String,
}

/// Response body for POST /connections.
#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    /// Handle to pass to `DELETE /connections/{connection_id}`.
    pub connection_id: ConnectionId,
    /// The validated participant name.
    pub participant: ParticipantId,
    /// Whether this name had never connected before.
    pub first_visit: bool,
}

/// Request body for POST /votes.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// The voter.
    pub participant: String,
    /// Index into the current node's choices.
    pub choice_index: usize,
}

/// Request body for POST /advance.
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    /// The participant confirming.
    pub participant: String,
}

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The speaker.
    pub participant: String,
    /// Message body.
    pub text: String,
}

/// Response body for accepted votes and chat messages.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `true`; rejections use an error status instead.
    pub success: bool,
    /// Human-readable status.
    pub message: String,
}

/// Response body for a successful advance.
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    /// Always `true`.
    pub success: bool,
    /// Human-readable status.
    pub message: String,
    /// The new current node.
    pub node_id: NodeId,
}

/// Resolves a name claimed by a caller that should already have joined.
///
/// A name that could never pass the handshake cannot belong to a joined
/// participant, so it is reported as unknown.
pub(crate) fn claimed_participant(name: &str) -> Result<ParticipantId, SessionError> {
    ParticipantId::parse(name).map_err(|_| SessionError::UnknownParticipant(name.trim().to_owned()))
}

/// POST /connections
#[instrument(skip(state, request), fields(name = %request.name))]
async fn connect(
    State(state): State<AppState>,
    Json(request): Json<ConnectRequest>,
) -> Result<(StatusCode, Json<ConnectResponse>), ApiError> {
    let command = JoinSession {
        correlation_id: Uuid::new_v4(),
        participant: ParticipantId::parse(&request.name)?,
        connection_id: ConnectionId::random(),
    };

    info!(correlation_id = %command.correlation_id, "handling connect");

    let connection = state.session.join(command, false).await?;
    let joined = connection.joined;

    Ok((
        StatusCode::CREATED,
        Json(ConnectResponse {
            connection_id: joined.connection_id,
            participant: joined.participant,
            first_visit: joined.first_visit,
        }),
    ))
}

/// `DELETE /connections/{connection_id}`
#[instrument(skip(state))]
async fn disconnect(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = LeaveSession {
        correlation_id: Uuid::new_v4(),
        connection_id: ConnectionId::from_uuid(connection_id),
    };

    info!(correlation_id = %command.correlation_id, "handling disconnect");

    state.session.leave(command).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /votes
#[instrument(
    skip(state, request),
    fields(participant = %request.participant, choice_index = request.choice_index)
)]
async fn vote(
    State(state): State<AppState>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let command = CastVote {
        correlation_id: Uuid::new_v4(),
        participant: claimed_participant(&request.participant)?,
        choice_index: request.choice_index,
    };

    info!(correlation_id = %command.correlation_id, "handling vote");

    let receipt = state.session.cast_vote(command).await?;

    Ok(Json(StatusResponse {
        success: true,
        message: receipt.message(),
    }))
}

/// POST /advance
#[instrument(skip(state, request), fields(participant = %request.participant))]
async fn advance(
    State(state): State<AppState>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let command = RequestAdvance {
        correlation_id: Uuid::new_v4(),
        participant: claimed_participant(&request.participant)?,
    };

    info!(correlation_id = %command.correlation_id, "handling advance");

    let advanced = state.session.request_advance(command).await?;

    Ok(Json(AdvanceResponse {
        success: true,
        message: advanced.message(),
        node_id: advanced.to,
    }))
}

/// POST /chat
#[instrument(skip(state, request), fields(participant = %request.participant))]
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let command = SendChat {
        correlation_id: Uuid::new_v4(),
        participant: claimed_participant(&request.participant)?,
        text: request.text,
    };

    info!(correlation_id = %command.correlation_id, "handling chat");

    state.session.send_chat(command).await?;

    Ok(Json(StatusResponse {
        success: true,
        message: "message sent".to_owned(),
    }))
}

/// GET /snapshot
async fn snapshot(State(state): State<AppState>) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.session.snapshot().await?))
}

/// Returns the router for the session.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connections", post(connect))
        .route("/connections/{connection_id}", delete(disconnect))
        .route("/votes", post(vote))
        .route("/advance", post(advance))
        .route("/chat", post(chat))
        .route("/snapshot", get(snapshot))
}
