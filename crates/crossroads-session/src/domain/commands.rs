//! Commands accepted by the session coordinator.

use crossroads_core::command::Command;
use crossroads_core::participant::ParticipantId;
use uuid::Uuid;

use super::registry::ConnectionId;

/// Handshake: a participant opens a connection.
#[derive(Debug, Clone)]
pub struct JoinSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The validated display name.
    pub participant: ParticipantId,
    /// Handle issued for this connection.
    pub connection_id: ConnectionId,
}

impl Command for JoinSession {
    fn command_type(&self) -> &'static str {
        "session.join"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn participant(&self) -> &ParticipantId {
        &self.participant
    }
}

/// A connection closed. Carries only the handle; the coordinator knows who
/// it belonged to.
#[derive(Debug, Clone)]
pub struct LeaveSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Handle of the closed connection.
    pub connection_id: ConnectionId,
}

/// Cast or change a vote on whatever node is current when it is applied.
#[derive(Debug, Clone)]
pub struct CastVote {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The voter.
    pub participant: ParticipantId,
    /// Index into the current node's choices.
    pub choice_index: usize,
}

impl Command for CastVote {
    fn command_type(&self) -> &'static str {
        "session.cast_vote"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn participant(&self) -> &ParticipantId {
        &self.participant
    }
}

/// Confirm readiness and attempt to advance.
#[derive(Debug, Clone)]
pub struct RequestAdvance {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The participant confirming.
    pub participant: ParticipantId,
}

impl Command for RequestAdvance {
    fn command_type(&self) -> &'static str {
        "session.request_advance"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn participant(&self) -> &ParticipantId {
        &self.participant
    }
}

/// Post a chat message.
#[derive(Debug, Clone)]
pub struct SendChat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The speaker.
    pub participant: ParticipantId,
    /// Message body.
    pub text: String,
}

impl Command for SendChat {
    fn command_type(&self) -> &'static str {
        "session.send_chat"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn participant(&self) -> &ParticipantId {
        &self.participant
    }
}
