//! Session State Machine.
//!
//! One state per narrative node; ending nodes are terminal. Every operation
//! either applies completely or returns an error having changed nothing,
//! except the documented side effects of a rejected advance (readiness
//! bookkeeping and the tie reset). Notifications produced by an operation
//! are queued and drained by the caller once the operation has returned.

use std::num::NonZeroUsize;
use std::sync::Arc;

use crossroads_core::clock::Clock;
use crossroads_core::error::SessionError;
use crossroads_core::event::EventMetadata;
use crossroads_core::participant::ParticipantId;
use crossroads_narrative::domain::graph::NarrativeGraph;
use crossroads_narrative::domain::node::{NarrativeNode, NodeId};
use tracing::debug;
use uuid::Uuid;

use super::chat::{ChatEntry, ChatLog};
use super::commands::{CastVote, JoinSession, LeaveSession, RequestAdvance, SendChat};
use super::events::{
    ChatAppended, NodeAdvanced, RosterChanged, SessionEvent, SessionEventKind, VotesChanged,
};
use super::ledger::{ReadinessSet, VoteLedger};
use super::registry::{ConnectionId, ParticipantRegistry};
use super::snapshot::SessionSnapshot;

/// Tunables for a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionSettings {
    /// Maximum retained chat entries; `None` keeps everything.
    pub chat_capacity: Option<NonZeroUsize>,
}

/// Result of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// Handle for the new connection.
    pub connection_id: ConnectionId,
    /// The participant that connected.
    pub participant: ParticipantId,
    /// Whether this was the participant's first appearance.
    pub first_visit: bool,
}

/// Result of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    /// Node the vote was recorded against.
    pub node_id: NodeId,
    /// The chosen index.
    pub choice_index: usize,
    /// Text of the chosen option.
    pub choice_text: String,
}

impl VoteReceipt {
    /// Human-readable status line.
    #[must_use]
    pub fn message(&self) -> String {
        format!("vote recorded for \"{}\"", self.choice_text)
    }
}

/// Result of a successful advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advanced {
    /// Node the session left.
    pub from: NodeId,
    /// Node the session is now on.
    pub to: NodeId,
    /// Index of the winning choice on `from`.
    pub choice_index: usize,
    /// Text of the winning choice.
    pub choice_text: String,
}

impl Advanced {
    /// Human-readable status line.
    #[must_use]
    pub fn message(&self) -> String {
        format!("advanced to {}", self.to)
    }
}

/// The composite state of one session.
#[derive(Debug)]
pub struct SessionState {
    graph: Arc<NarrativeGraph>,
    current: NarrativeNode,
    registry: ParticipantRegistry,
    votes: VoteLedger,
    readiness: ReadinessSet,
    chat: ChatLog,
    version: u64,
    pending: Vec<SessionEvent>,
}

impl SessionState {
    /// Starts a session on the graph's start node.
    #[must_use]
    pub fn new(graph: Arc<NarrativeGraph>, settings: SessionSettings) -> Self {
        let current = graph.start_node().clone();
        let chat = settings
            .chat_capacity
            .map_or_else(ChatLog::unbounded, ChatLog::bounded);
        Self {
            graph,
            current,
            registry: ParticipantRegistry::new(),
            votes: VoteLedger::default(),
            readiness: ReadinessSet::default(),
            chat,
            version: 0,
            pending: Vec::new(),
        }
    }

    /// Id of the current node.
    #[must_use]
    pub fn current_node_id(&self) -> &NodeId {
        &self.current.id
    }

    /// Number of mutations applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Read access to the registry.
    #[must_use]
    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// Registers a connection for an already validated participant.
    pub fn join(&mut self, command: &JoinSession, clock: &dyn Clock) -> Joined {
        let first_visit = self
            .registry
            .on_connect(command.connection_id, &command.participant);
        self.version += 1;
        self.emit_roster(command.correlation_id, clock);
        Joined {
            connection_id: command.connection_id,
            participant: command.participant.clone(),
            first_visit,
        }
    }

    /// Closes a connection. Votes and readiness of its participant are kept.
    /// Returns the participant, or `None` if the handle was unknown.
    pub fn leave(&mut self, command: &LeaveSession, clock: &dyn Clock) -> Option<ParticipantId> {
        let participant = self.registry.on_disconnect(command.connection_id)?;
        self.version += 1;
        self.emit_roster(command.correlation_id, clock);
        Some(participant)
    }

    /// Records a vote against the node current right now and withdraws the
    /// voter's readiness.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownParticipant` if the voter never joined
    /// and `SessionError::InvalidChoice` if the index is out of range.
    pub fn cast_vote(
        &mut self,
        command: &CastVote,
        clock: &dyn Clock,
    ) -> Result<VoteReceipt, SessionError> {
        self.ensure_joined(&command.participant)?;
        let Some(choice) = self.current.choice(command.choice_index) else {
            return Err(SessionError::InvalidChoice {
                node_id: self.current.id.to_string(),
                index: command.choice_index,
                available: self.current.choices.len(),
            });
        };
        let receipt = VoteReceipt {
            node_id: self.current.id.clone(),
            choice_index: command.choice_index,
            choice_text: choice.text.clone(),
        };

        self.votes
            .record(command.participant.clone(), command.choice_index);
        self.readiness.revoke(command.participant.as_str());
        self.version += 1;
        self.emit_votes(command.correlation_id, clock);
        Ok(receipt)
    }

    /// Confirms the caller's readiness and advances if the whole quorum has
    /// voted and confirmed.
    ///
    /// # Errors
    ///
    /// - `TerminalNode` on an ending.
    /// - `EmptyQuorum` if nobody ever joined.
    /// - `UnknownParticipant` if the caller never joined.
    /// - `IncompleteVotes` if any quorum member has not voted; the caller's
    ///   readiness is withdrawn.
    /// - `IncompleteReadiness` if any quorum member has not confirmed; the
    ///   caller's readiness is kept.
    /// - `TieVote` if several choices share the top count; votes and
    ///   readiness are cleared and the tie is announced in chat.
    /// - `DanglingTarget` if the winner leads to an unknown node; nothing
    ///   changes.
    pub fn request_advance(
        &mut self,
        command: &RequestAdvance,
        clock: &dyn Clock,
    ) -> Result<Advanced, SessionError> {
        let caller = &command.participant;
        if self.current.is_terminal() {
            return Err(SessionError::TerminalNode(self.current.id.to_string()));
        }
        let quorum = self.registry.count_ever_connected();
        if quorum == 0 {
            return Err(SessionError::EmptyQuorum);
        }
        self.ensure_joined(caller)?;

        let missing = self.votes.missing(self.registry.quorum());
        if !missing.is_empty() {
            // An early click does not count while votes are outstanding.
            if self.readiness.revoke(caller.as_str()) {
                self.version += 1;
            }
            return Err(SessionError::IncompleteVotes { missing, quorum });
        }

        let newly_ready = self.readiness.confirm(caller.clone());
        let missing = self.readiness.missing(self.registry.quorum());
        if !missing.is_empty() {
            if newly_ready {
                self.version += 1;
            }
            return Err(SessionError::IncompleteReadiness { missing, quorum });
        }

        let leaders = self.votes.leaders();
        if let [winner] = leaders.as_slice() {
            self.advance_to(*winner, newly_ready, command, clock)
        } else {
            self.reset_round(&leaders, command.correlation_id, clock);
            Err(SessionError::TieVote { tied: leaders })
        }
    }

    fn advance_to(
        &mut self,
        winner: usize,
        newly_ready: bool,
        command: &RequestAdvance,
        clock: &dyn Clock,
    ) -> Result<Advanced, SessionError> {
        let resolved = match self.current.choice(winner) {
            None => Err(SessionError::InvalidChoice {
                node_id: self.current.id.to_string(),
                index: winner,
                available: self.current.choices.len(),
            }),
            Some(choice) => self
                .graph
                .node(&choice.target)
                .map(|next| (choice.text.clone(), next.clone()))
                .ok_or_else(|| SessionError::DanglingTarget(choice.target.to_string())),
        };
        let (choice_text, next) = match resolved {
            Ok(found) => found,
            Err(err) => {
                if newly_ready {
                    self.readiness.revoke(command.participant.as_str());
                }
                return Err(err);
            }
        };

        let from = std::mem::replace(&mut self.current, next).id;
        self.votes.clear();
        self.readiness.clear();
        let announcement = ChatEntry::system(
            format!("The majority chose \"{choice_text}\". Advancing."),
            clock.now(),
        );
        self.chat.append(announcement.clone());
        self.version += 1;

        debug!(%from, to = %self.current.id, winner, "session advanced");
        self.emit(
            command.correlation_id,
            clock,
            SessionEventKind::NodeAdvanced(NodeAdvanced {
                node_id: self.current.id.clone(),
                node: self.current.clone(),
            }),
        );
        self.emit(
            command.correlation_id,
            clock,
            SessionEventKind::ChatAppended(ChatAppended {
                entries: vec![announcement],
            }),
        );
        self.emit_votes(command.correlation_id, clock);

        Ok(Advanced {
            from,
            to: self.current.id.clone(),
            choice_index: winner,
            choice_text,
        })
    }

    /// Clears every vote and confirmation and announces the tie.
    fn reset_round(&mut self, tied: &[usize], correlation_id: Uuid, clock: &dyn Clock) {
        let options: Vec<String> = tied
            .iter()
            .filter_map(|index| self.current.choice(*index))
            .map(|choice| format!("\"{}\"", choice.text))
            .collect();
        let announcement = ChatEntry::system(
            format!(
                "It's a tie between {}! Vote again to break it.",
                options.join(" and ")
            ),
            clock.now(),
        );
        self.chat.append(announcement.clone());
        self.votes.clear();
        self.readiness.clear();
        self.version += 1;

        debug!(node = %self.current.id, ?tied, "tie vote, round reset");
        self.emit(
            correlation_id,
            clock,
            SessionEventKind::ChatAppended(ChatAppended {
                entries: vec![announcement],
            }),
        );
        self.emit_votes(correlation_id, clock);
    }

    /// Appends a participant's chat message.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownParticipant` if the speaker never joined
    /// and `SessionError::EmptyMessage` for blank text.
    pub fn send_chat(
        &mut self,
        command: &SendChat,
        clock: &dyn Clock,
    ) -> Result<ChatEntry, SessionError> {
        self.ensure_joined(&command.participant)?;
        let text = command.text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let entry = ChatEntry::from_participant(&command.participant, text.to_owned(), clock.now());
        self.chat.append(entry.clone());
        self.version += 1;
        self.emit(
            command.correlation_id,
            clock,
            SessionEventKind::ChatAppended(ChatAppended {
                entries: vec![entry.clone()],
            }),
        );
        Ok(entry)
    }

    /// Captures the whole state in one consistent copy.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            title: self.graph.title().to_owned(),
            node_id: self.current.id.clone(),
            node: self.current.clone(),
            chat: self.chat.to_vec(),
            votes: self.votes.to_map(),
            ready: self.readiness.to_vec(),
            connected_count: self.registry.count_connected(),
            ever_connected_count: self.registry.count_ever_connected(),
            version: self.version,
        }
    }

    /// Drains the notifications queued by previous operations.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.pending)
    }

    fn ensure_joined(&self, participant: &ParticipantId) -> Result<(), SessionError> {
        if self.registry.has_joined(participant.as_str()) {
            Ok(())
        } else {
            Err(SessionError::UnknownParticipant(participant.to_string()))
        }
    }

    fn emit_votes(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let votes = self.votes.to_map();
        self.emit(
            correlation_id,
            clock,
            SessionEventKind::VotesChanged(VotesChanged { votes }),
        );
    }

    fn emit_roster(&mut self, correlation_id: Uuid, clock: &dyn Clock) {
        let roster = RosterChanged {
            connected: self.registry.count_connected(),
            ever_connected: self.registry.count_ever_connected(),
        };
        self.emit(
            correlation_id,
            clock,
            SessionEventKind::RosterChanged(roster),
        );
    }

    fn emit(&mut self, correlation_id: Uuid, clock: &dyn Clock, kind: SessionEventKind) {
        self.pending.push(SessionEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                sequence_number: self.version,
                correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossroads_core::event::DomainEvent;
    use crossroads_test_support::{
        FixedClock, crossroads_story, dangling_story, fixed_now, participant,
    };

    use crate::domain::events::{
        CHAT_APPENDED_EVENT_TYPE, NODE_ADVANCED_EVENT_TYPE, ROSTER_CHANGED_EVENT_TYPE,
        VOTES_CHANGED_EVENT_TYPE,
    };

    const X: usize = 0;
    const Y: usize = 1;

    struct Harness {
        state: SessionState,
        clock: FixedClock,
        connections: Vec<(ParticipantId, ConnectionId)>,
    }

    impl Harness {
        fn with_graph(graph: NarrativeGraph, names: &[&str]) -> Self {
            let mut harness = Self {
                state: SessionState::new(Arc::new(graph), SessionSettings::default()),
                clock: FixedClock(fixed_now()),
                connections: Vec::new(),
            };
            for name in names {
                harness.join(name);
            }
            harness.state.take_events();
            harness
        }

        fn new(names: &[&str]) -> Self {
            Self::with_graph(crossroads_story(), names)
        }

        fn join(&mut self, name: &str) -> Joined {
            let joined = self.state.join(
                &JoinSession {
                    correlation_id: Uuid::new_v4(),
                    participant: participant(name),
                    connection_id: ConnectionId::random(),
                },
                &self.clock,
            );
            self.connections
                .push((joined.participant.clone(), joined.connection_id));
            joined
        }

        fn leave(&mut self, name: &str) -> Option<ParticipantId> {
            let position = self
                .connections
                .iter()
                .position(|(id, _)| id.as_str() == name)?;
            let (_, connection_id) = self.connections.remove(position);
            self.state.leave(
                &LeaveSession {
                    correlation_id: Uuid::new_v4(),
                    connection_id,
                },
                &self.clock,
            )
        }

        fn vote(&mut self, name: &str, choice_index: usize) -> Result<VoteReceipt, SessionError> {
            self.state.cast_vote(
                &CastVote {
                    correlation_id: Uuid::new_v4(),
                    participant: participant(name),
                    choice_index,
                },
                &self.clock,
            )
        }

        fn advance(&mut self, name: &str) -> Result<Advanced, SessionError> {
            self.state.request_advance(
                &RequestAdvance {
                    correlation_id: Uuid::new_v4(),
                    participant: participant(name),
                },
                &self.clock,
            )
        }

        fn chat(&mut self, name: &str, text: &str) -> Result<ChatEntry, SessionError> {
            self.state.send_chat(
                &SendChat {
                    correlation_id: Uuid::new_v4(),
                    participant: participant(name),
                    text: text.to_owned(),
                },
                &self.clock,
            )
        }

        fn snapshot(&self) -> SessionSnapshot {
            self.state.snapshot()
        }
    }

    fn event_types(events: &[SessionEvent]) -> Vec<&'static str> {
        events.iter().map(DomainEvent::event_type).collect()
    }

    #[test]
    fn test_new_session_starts_on_start_node() {
        let harness = Harness::new(&[]);
        let snapshot = harness.snapshot();

        assert_eq!(snapshot.node_id, NodeId::new("fork"));
        assert_eq!(snapshot.title, "Crossroads");
        assert!(snapshot.votes.is_empty());
        assert!(snapshot.chat.is_empty());
        assert_eq!(snapshot.version, 0);
    }

    #[test]
    fn test_votes_reflect_latest_choice_per_participant() {
        let mut harness = Harness::new(&["Ana", "Bea"]);

        harness.vote("Ana", X).unwrap();
        harness.vote("Bea", Y).unwrap();
        harness.vote("Ana", 2).unwrap();
        harness.vote("Ana", 2).unwrap();

        let votes = harness.snapshot().votes;
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[&participant("Ana")], 2);
        assert_eq!(votes[&participant("Bea")], Y);
    }

    #[test]
    fn test_vote_out_of_range_is_rejected_without_change() {
        let mut harness = Harness::new(&["Ana"]);
        harness.vote("Ana", X).unwrap();
        harness.state.take_events();
        let before = harness.snapshot();

        let err = harness.vote("Ana", 3).unwrap_err();

        assert_eq!(
            err,
            SessionError::InvalidChoice {
                node_id: "fork".to_owned(),
                index: 3,
                available: 3,
            }
        );
        assert_eq!(harness.snapshot(), before);
        assert!(harness.state.take_events().is_empty());
    }

    #[test]
    fn test_vote_from_unknown_participant_is_rejected() {
        let mut harness = Harness::new(&["Ana"]);

        let err = harness.vote("Mallory", X).unwrap_err();

        assert_eq!(err, SessionError::UnknownParticipant("Mallory".to_owned()));
        assert!(harness.snapshot().votes.is_empty());
    }

    #[test]
    fn test_new_vote_always_revokes_readiness() {
        let mut harness = Harness::new(&["Ana", "Bea"]);
        harness.vote("Ana", X).unwrap();
        harness.vote("Bea", X).unwrap();
        let err = harness.advance("Ana").unwrap_err();
        assert!(matches!(err, SessionError::IncompleteReadiness { .. }));
        assert_eq!(harness.snapshot().ready, vec![participant("Ana")]);

        // Re-voting the same choice still withdraws the confirmation.
        harness.vote("Ana", X).unwrap();

        assert!(harness.snapshot().ready.is_empty());
    }

    #[test]
    fn test_vote_emits_votes_changed() {
        let mut harness = Harness::new(&["Ana"]);

        let receipt = harness.vote("Ana", Y).unwrap();

        assert_eq!(receipt.message(), "vote recorded for \"Take Y\"");
        let events = harness.state.take_events();
        assert_eq!(event_types(&events), vec![VOTES_CHANGED_EVENT_TYPE]);
        assert_eq!(events[0].metadata.sequence_number, harness.state.version());
    }

    #[test]
    fn test_advance_on_terminal_node_is_rejected() {
        let mut harness = Harness::new(&["Ana"]);
        harness.vote("Ana", Y).unwrap();
        harness.advance("Ana").unwrap();

        let err = harness.advance("Ana").unwrap_err();

        assert_eq!(err, SessionError::TerminalNode("y_path".to_owned()));
    }

    #[test]
    fn test_advance_with_empty_quorum_is_rejected() {
        let mut harness = Harness::new(&[]);

        assert_eq!(harness.advance("Ana").unwrap_err(), SessionError::EmptyQuorum);
    }

    #[test]
    fn test_advance_from_unknown_participant_is_rejected() {
        let mut harness = Harness::new(&["Ana"]);

        let err = harness.advance("Mallory").unwrap_err();

        assert_eq!(err, SessionError::UnknownParticipant("Mallory".to_owned()));
        assert!(harness.snapshot().ready.is_empty());
    }

    #[test]
    fn test_premature_advance_names_missing_voter_and_is_not_retained() {
        let mut harness = Harness::new(&["A", "B"]);
        harness.vote("A", X).unwrap();

        let err = harness.advance("A").unwrap_err();

        assert_eq!(
            err,
            SessionError::IncompleteVotes {
                missing: vec!["B".to_owned()],
                quorum: 2,
            }
        );
        assert!(harness.snapshot().ready.is_empty());

        // B alone cannot trigger the advance; A must confirm again.
        harness.vote("B", X).unwrap();
        let err = harness.advance("B").unwrap_err();
        assert_eq!(
            err,
            SessionError::IncompleteReadiness {
                missing: vec!["A".to_owned()],
                quorum: 2,
            }
        );
        assert_eq!(harness.snapshot().node_id, NodeId::new("fork"));

        let advanced = harness.advance("A").unwrap();
        assert_eq!(advanced.to, NodeId::new("x_path"));
    }

    #[test]
    fn test_incomplete_readiness_keeps_callers_confirmation() {
        let mut harness = Harness::new(&["A", "B", "C"]);
        for name in ["A", "B", "C"] {
            harness.vote(name, X).unwrap();
        }

        let err = harness.advance("B").unwrap_err();

        assert_eq!(
            err,
            SessionError::IncompleteReadiness {
                missing: vec!["A".to_owned(), "C".to_owned()],
                quorum: 3,
            }
        );
        assert_eq!(harness.snapshot().ready, vec![participant("B")]);
    }

    #[test]
    fn test_unanimous_advance_moves_to_winning_target_and_clears_round() {
        let mut harness = Harness::new(&["A", "B"]);
        harness.vote("A", X).unwrap();
        harness.vote("B", X).unwrap();
        harness.advance("A").unwrap_err();
        harness.state.take_events();
        let chat_before = harness.snapshot().chat.len();

        let advanced = harness.advance("B").unwrap();

        assert_eq!(
            advanced,
            Advanced {
                from: NodeId::new("fork"),
                to: NodeId::new("x_path"),
                choice_index: X,
                choice_text: "Take X".to_owned(),
            }
        );
        assert_eq!(advanced.message(), "advanced to x_path");
        let snapshot = harness.snapshot();
        assert_eq!(snapshot.node_id, NodeId::new("x_path"));
        assert_eq!(snapshot.node.text, "The X road winds on.");
        assert!(snapshot.votes.is_empty());
        assert!(snapshot.ready.is_empty());
        assert_eq!(snapshot.chat.len(), chat_before + 1);
        let announcement = snapshot.chat.last().unwrap();
        assert!(announcement.system);
        assert!(announcement.text.contains("Take X"));
        assert_eq!(
            event_types(&harness.state.take_events()),
            vec![
                NODE_ADVANCED_EVENT_TYPE,
                CHAT_APPENDED_EVENT_TYPE,
                VOTES_CHANGED_EVENT_TYPE,
            ]
        );
    }

    #[test]
    fn test_majority_wins_without_unanimity() {
        let mut harness = Harness::new(&["A", "B", "C"]);
        harness.vote("A", Y).unwrap();
        harness.vote("B", X).unwrap();
        harness.vote("C", Y).unwrap();
        harness.advance("A").unwrap_err();
        harness.advance("B").unwrap_err();

        let advanced = harness.advance("C").unwrap();

        assert_eq!(advanced.to, NodeId::new("y_path"));
    }

    #[test]
    fn test_tie_resets_round_and_announces_once() {
        let mut harness = Harness::new(&["A", "B"]);
        harness.vote("A", X).unwrap();
        harness.vote("B", Y).unwrap();
        harness.advance("A").unwrap_err();
        harness.state.take_events();
        let chat_before = harness.snapshot().chat.len();

        let err = harness.advance("B").unwrap_err();

        assert_eq!(err, SessionError::TieVote { tied: vec![X, Y] });
        let snapshot = harness.snapshot();
        assert_eq!(snapshot.node_id, NodeId::new("fork"));
        assert!(snapshot.votes.is_empty());
        assert!(snapshot.ready.is_empty());
        assert_eq!(snapshot.chat.len(), chat_before + 1);
        let announcement = snapshot.chat.last().unwrap();
        assert!(announcement.system);
        assert!(announcement.text.contains("tie"));
        assert_eq!(
            event_types(&harness.state.take_events()),
            vec![CHAT_APPENDED_EVENT_TYPE, VOTES_CHANGED_EVENT_TYPE]
        );
    }

    #[test]
    fn test_tie_then_revote_advances() {
        let mut harness = Harness::new(&["A", "B"]);
        harness.vote("A", X).unwrap();
        harness.vote("B", Y).unwrap();
        harness.advance("A").unwrap_err();
        harness.advance("B").unwrap_err();

        harness.vote("A", X).unwrap();
        harness.vote("B", X).unwrap();
        harness.advance("A").unwrap_err();
        let advanced = harness.advance("B").unwrap();

        assert_eq!(advanced.to, NodeId::new("x_path"));
        let chat = harness.snapshot().chat;
        assert_eq!(chat.len(), 2);
        assert!(chat.iter().all(|entry| entry.system));
    }

    #[test]
    fn test_disconnected_voter_still_counts_toward_quorum() {
        let mut harness = Harness::new(&["A", "B"]);
        harness.vote("B", X).unwrap();
        harness.advance("B").unwrap_err();
        harness.vote("B", X).unwrap();

        assert_eq!(harness.leave("B"), Some(participant("B")));
        let snapshot = harness.snapshot();
        assert_eq!(snapshot.votes[&participant("B")], X);
        assert_eq!(snapshot.connected_count, 1);
        assert_eq!(snapshot.ever_connected_count, 2);

        harness.vote("A", X).unwrap();
        let err = harness.advance("A").unwrap_err();
        assert_eq!(
            err,
            SessionError::IncompleteReadiness {
                missing: vec!["B".to_owned()],
                quorum: 2,
            }
        );
    }

    #[test]
    fn test_disconnect_keeps_readiness() {
        let mut harness = Harness::new(&["A", "B"]);
        harness.vote("A", X).unwrap();
        harness.vote("B", X).unwrap();
        harness.advance("B").unwrap_err();

        harness.leave("B");
        let advanced = harness.advance("A").unwrap();

        assert_eq!(advanced.to, NodeId::new("x_path"));
    }

    #[test]
    fn test_departed_participant_without_vote_blocks_advance() {
        let mut harness = Harness::new(&["A", "B"]);
        harness.leave("B");
        harness.vote("A", X).unwrap();

        let err = harness.advance("A").unwrap_err();

        assert_eq!(
            err,
            SessionError::IncompleteVotes {
                missing: vec!["B".to_owned()],
                quorum: 2,
            }
        );
    }

    #[test]
    fn test_late_joiner_invalidates_complete_tally() {
        let mut harness = Harness::new(&["A"]);
        harness.vote("A", X).unwrap();
        harness.join("B");

        let err = harness.advance("A").unwrap_err();

        assert!(matches!(err, SessionError::IncompleteVotes { .. }));
        assert_eq!(harness.snapshot().node_id, NodeId::new("fork"));
    }

    #[test]
    fn test_ever_connected_never_decreases() {
        let mut harness = Harness::new(&["A", "B"]);

        harness.leave("A");
        harness.leave("B");
        harness.join("A");

        let snapshot = harness.snapshot();
        assert_eq!(snapshot.ever_connected_count, 2);
        assert_eq!(snapshot.connected_count, 1);
    }

    #[test]
    fn test_join_and_leave_emit_roster_changes() {
        let mut harness = Harness::new(&[]);

        let joined = harness.join("Ana");
        harness.leave("Ana");
        harness.join("Ana");

        assert!(joined.first_visit);
        let events = harness.state.take_events();
        assert_eq!(
            event_types(&events),
            vec![
                ROSTER_CHANGED_EVENT_TYPE,
                ROSTER_CHANGED_EVENT_TYPE,
                ROSTER_CHANGED_EVENT_TYPE,
            ]
        );
        assert_eq!(
            events[1].kind,
            SessionEventKind::RosterChanged(RosterChanged {
                connected: 0,
                ever_connected: 1,
            })
        );
    }

    #[test]
    fn test_leave_with_unknown_connection_changes_nothing() {
        let mut harness = Harness::new(&["Ana"]);
        let version = harness.state.version();

        let left = harness.state.leave(
            &LeaveSession {
                correlation_id: Uuid::new_v4(),
                connection_id: ConnectionId::random(),
            },
            &harness.clock,
        );

        assert_eq!(left, None);
        assert_eq!(harness.state.version(), version);
        assert!(harness.state.take_events().is_empty());
    }

    #[test]
    fn test_dangling_winner_leaves_state_untouched() {
        let mut harness = Harness::with_graph(dangling_story(), &["A"]);
        harness.vote("A", 0).unwrap();
        harness.state.take_events();
        let before = harness.snapshot();

        let err = harness.advance("A").unwrap_err();

        assert_eq!(err, SessionError::DanglingTarget("nowhere".to_owned()));
        assert_eq!(harness.snapshot(), before);
        assert!(harness.state.take_events().is_empty());
    }

    #[test]
    fn test_chat_appends_in_order_and_rejects_blank_text() {
        let mut harness = Harness::new(&["Ana", "Bea"]);

        harness.chat("Ana", "  left or right? ").unwrap();
        harness.chat("Bea", "right").unwrap();
        let err = harness.chat("Ana", "   ").unwrap_err();

        assert_eq!(err, SessionError::EmptyMessage);
        let lines: Vec<String> = harness
            .snapshot()
            .chat
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(lines, vec!["[Ana] left or right?", "[Bea] right"]);
    }

    #[test]
    fn test_bounded_chat_capacity_is_honoured() {
        let settings = SessionSettings {
            chat_capacity: NonZeroUsize::new(2),
        };
        let mut state = SessionState::new(Arc::new(crossroads_story()), settings);
        let clock = FixedClock(fixed_now());
        let ana = participant("Ana");
        state.join(
            &JoinSession {
                correlation_id: Uuid::new_v4(),
                participant: ana.clone(),
                connection_id: ConnectionId::random(),
            },
            &clock,
        );

        for text in ["one", "two", "three"] {
            state
                .send_chat(
                    &SendChat {
                        correlation_id: Uuid::new_v4(),
                        participant: ana.clone(),
                        text: text.to_owned(),
                    },
                    &clock,
                )
                .unwrap();
        }

        let texts: Vec<String> = state.snapshot().chat.into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn test_snapshot_tally_counts_votes_per_choice() {
        let mut harness = Harness::new(&["A", "B", "C"]);
        harness.vote("A", X).unwrap();
        harness.vote("B", 2).unwrap();
        harness.vote("C", 2).unwrap();

        assert_eq!(harness.snapshot().tally(), vec![1, 0, 2]);
    }

    #[test]
    fn test_events_carry_command_correlation_id() {
        let mut harness = Harness::new(&["Ana"]);
        let correlation_id = Uuid::new_v4();

        harness
            .state
            .cast_vote(
                &CastVote {
                    correlation_id,
                    participant: participant("Ana"),
                    choice_index: X,
                },
                &harness.clock,
            )
            .unwrap();

        let events = harness.state.take_events();
        assert_eq!(events[0].metadata.correlation_id, correlation_id);
        assert_eq!(events[0].metadata.occurred_at, fixed_now());
    }
}
