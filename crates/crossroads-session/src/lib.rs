//! Crossroads — Session coordinator.
//!
//! Owns the shared state of one group-story session (current node, votes,
//! readiness, chat log, participant roster) and the quorum protocol that
//! advances it. `domain` holds the synchronous state machine; `application`
//! runs it inside a single owning task and fans notifications out to
//! connected participants.

pub mod application;
pub mod domain;
