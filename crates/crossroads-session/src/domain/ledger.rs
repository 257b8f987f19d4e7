//! Vote Ledger and Readiness Set.

use std::collections::{BTreeMap, BTreeSet};

use crossroads_core::participant::ParticipantId;

/// Latest choice index per participant for the current node.
///
/// Entries survive disconnects; they are only cleared when the node advances
/// or a tie resets the round.
#[derive(Debug, Default, Clone)]
pub struct VoteLedger {
    votes: BTreeMap<ParticipantId, usize>,
}

impl VoteLedger {
    /// Records or overwrites a participant's vote. Returns the previous
    /// choice, if any.
    pub fn record(&mut self, participant: ParticipantId, choice_index: usize) -> Option<usize> {
        self.votes.insert(participant, choice_index)
    }

    /// Quorum members without a vote, sorted.
    #[must_use]
    pub fn missing(&self, quorum: &BTreeSet<ParticipantId>) -> Vec<String> {
        quorum
            .iter()
            .filter(|id| !self.votes.contains_key(id.as_str()))
            .map(ToString::to_string)
            .collect()
    }

    /// Vote count per choice index.
    #[must_use]
    pub fn tally(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for choice in self.votes.values() {
            *counts.entry(*choice).or_insert(0) += 1;
        }
        counts
    }

    /// Choice indices sharing the highest count, ascending. Empty when no
    /// votes are recorded.
    #[must_use]
    pub fn leaders(&self) -> Vec<usize> {
        let counts = self.tally();
        let Some(top) = counts.values().copied().max() else {
            return Vec::new();
        };
        counts
            .into_iter()
            .filter(|(_, count)| *count == top)
            .map(|(choice, _)| choice)
            .collect()
    }

    /// Copy of every vote.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<ParticipantId, usize> {
        self.votes.clone()
    }

    /// Drops every vote.
    pub fn clear(&mut self) {
        self.votes.clear();
    }
}

/// Participants who confirmed advancement under the current tally.
#[derive(Debug, Default, Clone)]
pub struct ReadinessSet {
    ready: BTreeSet<ParticipantId>,
}

impl ReadinessSet {
    /// Marks a participant ready. Returns `true` if they were not already.
    pub fn confirm(&mut self, participant: ParticipantId) -> bool {
        self.ready.insert(participant)
    }

    /// Withdraws a participant's confirmation. Returns `true` if they were
    /// ready.
    pub fn revoke(&mut self, participant: &str) -> bool {
        self.ready.remove(participant)
    }

    /// Quorum members who have not confirmed, sorted.
    #[must_use]
    pub fn missing(&self, quorum: &BTreeSet<ParticipantId>) -> Vec<String> {
        quorum
            .difference(&self.ready)
            .map(ToString::to_string)
            .collect()
    }

    /// Ready participants, sorted.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ParticipantId> {
        self.ready.iter().cloned().collect()
    }

    /// Withdraws every confirmation.
    pub fn clear(&mut self) {
        self.ready.clear();
    }
}
