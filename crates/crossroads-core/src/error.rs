//! Coordinator error taxonomy.
//!
//! Every condition here is an expected outcome reported back to the caller.
//! None of them leaves the session half-mutated.

use thiserror::Error;

/// Conditions the session coordinator reports instead of applying a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The vote index is out of range for the current node.
    #[error("invalid choice {index}: node `{node_id}` offers {available} choice(s)")]
    InvalidChoice {
        /// Node that was current when the vote was evaluated.
        node_id: String,
        /// The rejected index.
        index: usize,
        /// Number of choices on the current node.
        available: usize,
    },

    /// Advance was requested on an ending node.
    #[error("node `{0}` is an ending, there is nothing to advance to")]
    TerminalNode(String),

    /// Advance was requested before anyone ever joined.
    #[error("no participants have joined this session")]
    EmptyQuorum,

    /// Some members of the quorum have not voted yet.
    #[error(
        "waiting for {}/{quorum} to vote: {}",
        .missing.len(),
        .missing.join(", ")
    )]
    IncompleteVotes {
        /// Participants without a recorded vote, sorted.
        missing: Vec<String>,
        /// Size of the quorum universe.
        quorum: usize,
    },

    /// Everyone voted but some members have not confirmed advancing.
    #[error(
        "waiting for {}/{quorum} to confirm advance: {}",
        .missing.len(),
        .missing.join(", ")
    )]
    IncompleteReadiness {
        /// Participants who have not confirmed, sorted.
        missing: Vec<String>,
        /// Size of the quorum universe.
        quorum: usize,
    },

    /// The top vote count was shared; votes and readiness were reset.
    #[error("the vote is tied, cast your votes again")]
    TieVote {
        /// Choice indices that shared the top count, ascending.
        tied: Vec<usize>,
    },

    /// The caller never completed a handshake in this session.
    #[error("participant `{0}` has not joined this session")]
    UnknownParticipant(String),

    /// A chat message with no visible text.
    #[error("chat message is empty")]
    EmptyMessage,

    /// The identity exchange could not be completed.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// The winning choice points at a node the story does not contain.
    #[error("choice leads to unknown node `{0}`")]
    DanglingTarget(String),

    /// The coordinator task is no longer running.
    #[error("session coordinator is unavailable")]
    Unavailable,
}

impl SessionError {
    /// Participant names the caller is waiting on, if the condition has any.
    #[must_use]
    pub fn missing_participants(&self) -> &[String] {
        match self {
            Self::IncompleteVotes { missing, .. } | Self::IncompleteReadiness { missing, .. } => {
                missing
            }
            _ => &[],
        }
    }
}
