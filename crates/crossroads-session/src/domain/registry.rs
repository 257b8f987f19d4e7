//! Participant Registry.
//!
//! Tracks open connections and the ever-connected set. The ever-connected set
//! is the quorum universe and only grows for the lifetime of a session.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crossroads_core::participant::ParticipantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle for one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Issues a fresh random connection handle.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Connected and ever-connected participants.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    connections: HashMap<ConnectionId, ParticipantId>,
    /// Open connection count per participant; absent means offline.
    online: HashMap<ParticipantId, usize>,
    ever_connected: BTreeSet<ParticipantId>,
}

impl ParticipantRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Returns `true` if this is the participant's
    /// first appearance in the session.
    pub fn on_connect(&mut self, connection: ConnectionId, participant: &ParticipantId) -> bool {
        if let Some(previous) = self.connections.insert(connection, participant.clone()) {
            // Re-registering the same handle must not inflate the count.
            self.release(&previous);
        }
        *self.online.entry(participant.clone()).or_insert(0) += 1;
        self.ever_connected.insert(participant.clone())
    }

    /// Closes a connection. Returns the participant it belonged to, or `None`
    /// for an unknown handle. The ever-connected set is never touched.
    pub fn on_disconnect(&mut self, connection: ConnectionId) -> Option<ParticipantId> {
        let participant = self.connections.remove(&connection)?;
        self.release(&participant);
        Some(participant)
    }

    fn release(&mut self, participant: &ParticipantId) {
        if let Some(count) = self.online.get_mut(participant) {
            *count -= 1;
            if *count == 0 {
                self.online.remove(participant);
            }
        }
    }

    /// Number of distinct participants with at least one open connection.
    #[must_use]
    pub fn count_connected(&self) -> usize {
        self.online.len()
    }

    /// Number of participants who ever connected.
    #[must_use]
    pub fn count_ever_connected(&self) -> usize {
        self.ever_connected.len()
    }

    /// Whether the participant currently has an open connection.
    #[must_use]
    pub fn is_connected(&self, participant: &str) -> bool {
        self.online.contains_key(participant)
    }

    /// Whether the participant ever completed a handshake.
    #[must_use]
    pub fn has_joined(&self, participant: &str) -> bool {
        self.ever_connected.contains(participant)
    }

    /// The quorum universe, sorted by name.
    #[must_use]
    pub fn quorum(&self) -> &BTreeSet<ParticipantId> {
        &self.ever_connected
    }
}
