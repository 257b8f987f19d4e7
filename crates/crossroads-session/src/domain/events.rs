//! Notification events published after session state changes.

use std::collections::BTreeMap;

use crossroads_core::event::{DomainEvent, EventMetadata};
use crossroads_core::participant::ParticipantId;
use crossroads_narrative::domain::node::{NarrativeNode, NodeId};
use serde::{Deserialize, Serialize};

use super::chat::ChatEntry;

/// Emitted when the session moves to a new node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAdvanced {
    /// The new current node.
    pub node_id: NodeId,
    /// Its content.
    pub node: NarrativeNode,
}

/// Emitted when chat entries are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAppended {
    /// The entries appended by one operation, oldest first.
    pub entries: Vec<ChatEntry>,
}

/// Emitted whenever the vote ledger changes, including resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesChanged {
    /// Full copy of the ledger after the change.
    pub votes: BTreeMap<ParticipantId, usize>,
}

/// Emitted when a participant connects or disconnects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterChanged {
    /// Distinct participants currently connected.
    pub connected: usize,
    /// Participants who ever connected.
    pub ever_connected: usize,
}

/// Event type identifier for [`NodeAdvanced`].
pub const NODE_ADVANCED_EVENT_TYPE: &str = "session.node_advanced";

/// Event type identifier for [`ChatAppended`].
pub const CHAT_APPENDED_EVENT_TYPE: &str = "session.chat_appended";

/// Event type identifier for [`VotesChanged`].
pub const VOTES_CHANGED_EVENT_TYPE: &str = "session.votes_changed";

/// Event type identifier for [`RosterChanged`].
pub const ROSTER_CHANGED_EVENT_TYPE: &str = "session.roster_changed";

/// Notification payload variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    /// The current node changed.
    NodeAdvanced(NodeAdvanced),
    /// Chat entries were appended.
    ChatAppended(ChatAppended),
    /// The vote ledger changed.
    VotesChanged(VotesChanged),
    /// Connection counts changed.
    RosterChanged(RosterChanged),
}

impl SessionEventKind {
    /// The event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NodeAdvanced(_) => NODE_ADVANCED_EVENT_TYPE,
            Self::ChatAppended(_) => CHAT_APPENDED_EVENT_TYPE,
            Self::VotesChanged(_) => VOTES_CHANGED_EVENT_TYPE,
            Self::RosterChanged(_) => ROSTER_CHANGED_EVENT_TYPE,
        }
    }
}

/// Notification envelope delivered to connected participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SessionEventKind,
}

impl DomainEvent for SessionEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
