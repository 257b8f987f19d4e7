//! Atomic point-in-time view of a session.

use std::collections::BTreeMap;

use crossroads_core::participant::ParticipantId;
use crossroads_narrative::domain::node::{NarrativeNode, NodeId};
use serde::{Deserialize, Serialize};

use super::chat::ChatEntry;

/// Everything a client needs to render the session, captured in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Story title.
    pub title: String,
    /// Current node id.
    pub node_id: NodeId,
    /// Current node content.
    pub node: NarrativeNode,
    /// Retained chat history, oldest first.
    pub chat: Vec<ChatEntry>,
    /// Latest choice per participant on the current node.
    pub votes: BTreeMap<ParticipantId, usize>,
    /// Participants who confirmed advancing, sorted.
    pub ready: Vec<ParticipantId>,
    /// Distinct participants currently connected.
    pub connected_count: usize,
    /// Participants who ever connected; the quorum size.
    pub ever_connected_count: usize,
    /// Number of mutations applied so far.
    pub version: u64,
}

impl SessionSnapshot {
    /// Vote count per choice index of the current node, zero-filled.
    #[must_use]
    pub fn tally(&self) -> Vec<usize> {
        let mut counts = vec![0; self.node.choices.len()];
        for choice in self.votes.values() {
            if let Some(count) = counts.get_mut(*choice) {
                *count += 1;
            }
        }
        counts
    }
}
