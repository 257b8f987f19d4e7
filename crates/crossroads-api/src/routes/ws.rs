//! WebSocket push channel.
//!
//! A socket is one connection: the handshake runs on upgrade, every
//! notification is pushed as it is published, and the connection is closed
//! in the coordinator when the socket ends. Clients may also vote, advance,
//! chat and request snapshots over the same socket.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::{Router, routing::get};
use crossroads_core::error::SessionError;
use crossroads_core::event::{DomainEvent, EventMetadata};
use crossroads_core::participant::ParticipantId;
use crossroads_session::domain::commands::{
    CastVote, JoinSession, LeaveSession, RequestAdvance, SendChat,
};
use crossroads_session::domain::events::{SessionEvent, SessionEventKind};
use crossroads_session::domain::registry::ConnectionId;
use crossroads_session::domain::snapshot::SessionSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

/// Query string for GET /ws.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Self-declared display name.
    pub name: String,
}

/// Messages a client may send over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Cast or change a vote.
    Vote {
        /// Index into the current node's choices.
        choice_index: usize,
    },
    /// Confirm readiness.
    Advance,
    /// Post a chat message.
    Chat {
        /// Message body.
        text: String,
    },
    /// Ask for the full state.
    Snapshot,
}

/// Messages the server pushes over the socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    /// First message after the handshake.
    Welcome {
        /// Handle of this connection.
        connection_id: ConnectionId,
        /// The validated participant name.
        participant: ParticipantId,
        /// Whether this name had never connected before.
        first_visit: bool,
        /// State at the moment of connecting.
        snapshot: SessionSnapshot,
    },
    /// A published notification.
    Event {
        /// Type name clients dispatch on.
        event_type: &'static str,
        /// Identity, ordering and correlation of the notification.
        metadata: &'a EventMetadata,
        /// The notification body.
        payload: &'a SessionEventKind,
    },
    /// Reply to a snapshot request.
    Snapshot {
        /// The current state.
        snapshot: SessionSnapshot,
    },
    /// A client request was applied.
    Ack {
        /// Which request.
        request: &'static str,
        /// Human-readable status.
        message: String,
    },
    /// A client request was rejected.
    Error(ErrorBody),
}

impl<'a> ServerMessage<'a> {
    fn rejected(err: &SessionError) -> Self {
        Self::Error(ErrorBody::from(err))
    }

    fn event(event: &'a SessionEvent) -> Self {
        Self::Event {
            event_type: event.event_type(),
            metadata: event.metadata(),
            payload: &event.kind,
        }
    }
}

/// GET /ws?name=...
///
/// The name is validated before upgrading so a rejected handshake gets a
/// plain HTTP error.
async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let participant = ParticipantId::parse(&query.name)?;
    Ok(ws.on_upgrade(move |socket| run_connection(socket, state, participant)))
}

#[instrument(skip(socket, state, participant), fields(participant = %participant))]
async fn run_connection(mut socket: WebSocket, state: AppState, participant: ParticipantId) {
    let command = JoinSession {
        correlation_id: Uuid::new_v4(),
        participant,
        connection_id: ConnectionId::random(),
    };
    let connection = match state.session.join(command, true).await {
        Ok(connection) => connection,
        Err(err) => {
            warn!(%err, "handshake failed");
            let _ = send(&mut socket, &ServerMessage::rejected(&err)).await;
            return;
        }
    };
    let joined = connection.joined;
    let Some(mut events) = connection.events else {
        warn!("coordinator returned no push channel");
        close(&state, joined.connection_id).await;
        return;
    };
    info!(connection = %joined.connection_id, "websocket connected");

    let welcome = match state.session.snapshot().await {
        Ok(snapshot) => ServerMessage::Welcome {
            connection_id: joined.connection_id,
            participant: joined.participant.clone(),
            first_visit: joined.first_visit,
            snapshot,
        },
        Err(err) => ServerMessage::rejected(&err),
    };

    if send(&mut socket, &welcome).await.is_ok() {
        loop {
            tokio::select! {
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_client_message(&state, &joined.participant, text.as_str()).await;
                        if send(&mut socket, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(%err, "websocket receive failed");
                        break;
                    }
                },
                event = events.recv() => {
                    let Some(event) = event else {
                        // The coordinator dropped this subscriber.
                        break;
                    };
                    if send(&mut socket, &ServerMessage::event(&event)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    close(&state, joined.connection_id).await;
    info!(connection = %joined.connection_id, "websocket closed");
}

async fn close(state: &AppState, connection_id: ConnectionId) {
    let command = LeaveSession {
        correlation_id: Uuid::new_v4(),
        connection_id,
    };
    if let Err(err) = state.session.leave(command).await {
        warn!(%err, %connection_id, "could not close connection");
    }
}

async fn send(socket: &mut WebSocket, message: &ServerMessage<'_>) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(err) => {
            warn!(%err, "dropping unserializable message");
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await
}

/// Applies one client message on behalf of `participant` and builds the
/// reply.
pub(crate) async fn handle_client_message(
    state: &AppState,
    participant: &ParticipantId,
    text: &str,
) -> ServerMessage<'static> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            return ServerMessage::Error(ErrorBody::new("malformed_message", err.to_string()));
        }
    };

    let correlation_id = Uuid::new_v4();
    debug!(%correlation_id, ?message, "handling client message");
    let result = match message {
        ClientMessage::Vote { choice_index } => state
            .session
            .cast_vote(CastVote {
                correlation_id,
                participant: participant.clone(),
                choice_index,
            })
            .await
            .map(|receipt| ServerMessage::Ack {
                request: "vote",
                message: receipt.message(),
            }),
        ClientMessage::Advance => state
            .session
            .request_advance(RequestAdvance {
                correlation_id,
                participant: participant.clone(),
            })
            .await
            .map(|advanced| ServerMessage::Ack {
                request: "advance",
                message: advanced.message(),
            }),
        ClientMessage::Chat { text } => state
            .session
            .send_chat(SendChat {
                correlation_id,
                participant: participant.clone(),
                text,
            })
            .await
            .map(|_| ServerMessage::Ack {
                request: "chat",
                message: "message sent".to_owned(),
            }),
        ClientMessage::Snapshot => state
            .session
            .snapshot()
            .await
            .map(|snapshot| ServerMessage::Snapshot { snapshot }),
    };

    result.unwrap_or_else(|err| ServerMessage::rejected(&err))
}

/// Returns the WebSocket router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}
