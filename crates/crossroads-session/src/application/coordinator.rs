//! Session coordinator actor.
//!
//! A single task owns the `SessionState` and applies requests one at a time
//! from its mailbox, which makes every operation atomic with respect to all
//! others. Notifications are fanned out after the request has been applied
//! and answered, from events captured while applying it.

use std::sync::Arc;

use crossroads_core::clock::Clock;
use crossroads_core::command::Command;
use crossroads_core::error::SessionError;
use crossroads_core::participant::ParticipantId;
use crossroads_narrative::domain::graph::NarrativeGraph;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::fanout::{EventReceiver, Fanout};
use crate::domain::chat::ChatEntry;
use crate::domain::commands::{CastVote, JoinSession, LeaveSession, RequestAdvance, SendChat};
use crate::domain::snapshot::SessionSnapshot;
use crate::domain::state::{Advanced, Joined, SessionSettings, SessionState, VoteReceipt};

/// Coordinator tunables.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Session settings.
    pub session: SessionSettings,
    /// Requests that may queue before callers wait for room.
    pub mailbox_capacity: usize,
    /// Pending notifications buffered per subscriber.
    pub subscriber_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            mailbox_capacity: 256,
            subscriber_buffer: 32,
        }
    }
}

/// An accepted connection.
#[derive(Debug)]
pub struct Connection {
    /// Handshake result.
    pub joined: Joined,
    /// Push channel, present when the caller subscribed.
    pub events: Option<EventReceiver>,
}

#[derive(Debug)]
enum Request {
    Join {
        command: JoinSession,
        subscribe: bool,
        reply: oneshot::Sender<Connection>,
    },
    Leave {
        command: LeaveSession,
        reply: oneshot::Sender<Option<ParticipantId>>,
    },
    Vote {
        command: CastVote,
        reply: oneshot::Sender<Result<VoteReceipt, SessionError>>,
    },
    Advance {
        command: RequestAdvance,
        reply: oneshot::Sender<Result<Advanced, SessionError>>,
    },
    Chat {
        command: SendChat,
        reply: oneshot::Sender<Result<ChatEntry, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Owner of one session's state.
pub struct SessionCoordinator {
    state: SessionState,
    fanout: Fanout,
    clock: Arc<dyn Clock>,
    mailbox: mpsc::Receiver<Request>,
}

impl SessionCoordinator {
    /// Starts the coordinator task on the current tokio runtime.
    ///
    /// The task stops once every [`SessionHandle`] has been dropped.
    #[must_use]
    pub fn spawn(
        graph: Arc<NarrativeGraph>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (sender, mailbox) = mpsc::channel(config.mailbox_capacity.max(1));
        let coordinator = Self {
            state: SessionState::new(graph, config.session),
            fanout: Fanout::new(config.subscriber_buffer),
            clock,
            mailbox,
        };
        let task = tokio::spawn(coordinator.run());
        (SessionHandle { mailbox: sender }, task)
    }

    async fn run(mut self) {
        info!(node = %self.state.current_node_id(), "session coordinator started");
        while let Some(request) = self.mailbox.recv().await {
            self.handle(request);
            self.flush();
        }
        info!(version = self.state.version(), "session coordinator stopped");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Join {
                command,
                subscribe,
                reply,
            } => self.on_join(&command, subscribe, reply),
            Request::Leave { command, reply } => {
                let left = self.on_leave(&command);
                // Nobody waits for a disconnect to be acknowledged.
                let _ = reply.send(left);
            }
            Request::Vote { command, reply } => {
                let result = self.on_vote(&command);
                if reply.send(result).is_err() {
                    debug!(correlation_id = %command.correlation_id, "vote caller went away");
                }
            }
            Request::Advance { command, reply } => {
                let result = self.on_advance(&command);
                if reply.send(result).is_err() {
                    debug!(correlation_id = %command.correlation_id, "advance caller went away");
                }
            }
            Request::Chat { command, reply } => {
                let result = self.on_chat(&command);
                if reply.send(result).is_err() {
                    debug!(correlation_id = %command.correlation_id, "chat caller went away");
                }
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    #[instrument(
        skip(self, command, reply),
        fields(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            participant = %command.participant(),
        )
    )]
    fn on_join(
        &mut self,
        command: &JoinSession,
        subscribe: bool,
        reply: oneshot::Sender<Connection>,
    ) {
        let joined = self.state.join(command, self.clock.as_ref());
        let events = subscribe.then(|| {
            self.fanout
                .subscribe(joined.connection_id, joined.participant.clone())
        });
        info!(
            connection = %joined.connection_id,
            first_visit = joined.first_visit,
            connected = self.state.registry().count_connected(),
            ever_connected = self.state.registry().count_ever_connected(),
            subscribers = self.fanout.subscriber_count(),
            "participant connected"
        );

        let connection_id = joined.connection_id;
        if reply.send(Connection { joined, events }).is_err() {
            warn!(connection = %connection_id, "handshake caller went away, closing connection");
            self.on_leave(&LeaveSession {
                correlation_id: command.correlation_id,
                connection_id,
            });
        }
    }

    #[instrument(
        skip(self, command),
        fields(correlation_id = %command.correlation_id, connection = %command.connection_id)
    )]
    fn on_leave(&mut self, command: &LeaveSession) -> Option<ParticipantId> {
        self.fanout.unsubscribe(command.connection_id);
        let left = self.state.leave(command, self.clock.as_ref());
        if let Some(participant) = &left {
            info!(
                %participant,
                still_connected = self.state.registry().is_connected(participant.as_str()),
                connected = self.state.registry().count_connected(),
                subscribers = self.fanout.subscriber_count(),
                "participant disconnected, votes kept"
            );
        } else {
            debug!("disconnect for unknown connection ignored");
        }
        left
    }

    #[instrument(
        skip(self, command),
        fields(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            participant = %command.participant(),
            choice_index = command.choice_index,
        )
    )]
    fn on_vote(&mut self, command: &CastVote) -> Result<VoteReceipt, SessionError> {
        let result = self.state.cast_vote(command, self.clock.as_ref());
        match &result {
            Ok(receipt) => info!(node = %receipt.node_id, "vote recorded"),
            Err(err) => info!(reason = %err, "vote rejected"),
        }
        result
    }

    #[instrument(
        skip(self, command),
        fields(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            participant = %command.participant(),
        )
    )]
    fn on_advance(&mut self, command: &RequestAdvance) -> Result<Advanced, SessionError> {
        let result = self.state.request_advance(command, self.clock.as_ref());
        match &result {
            Ok(advanced) => info!(from = %advanced.from, to = %advanced.to, "session advanced"),
            Err(SessionError::DanglingTarget(target)) => {
                warn!(%target, "winning choice leads to an unknown node");
            }
            Err(err) => info!(reason = %err, "advance not applied"),
        }
        result
    }

    #[instrument(
        skip(self, command),
        fields(
            command_type = command.command_type(),
            correlation_id = %command.correlation_id(),
            participant = %command.participant(),
        )
    )]
    fn on_chat(&mut self, command: &SendChat) -> Result<ChatEntry, SessionError> {
        let result = self.state.send_chat(command, self.clock.as_ref());
        if let Err(err) = &result {
            info!(reason = %err, "chat rejected");
        }
        result
    }

    fn flush(&mut self) {
        for event in self.state.take_events() {
            self.fanout.publish(&Arc::new(event));
        }
    }
}

/// Cloneable client of the coordinator task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    mailbox: mpsc::Sender<Request>,
}

impl SessionHandle {
    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(request(reply))
            .await
            .map_err(|_| SessionError::Unavailable)?;
        response.await.map_err(|_| SessionError::Unavailable)
    }

    /// Completes a handshake, optionally opening a push channel for the new
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unavailable` if the coordinator has stopped.
    pub async fn join(
        &self,
        command: JoinSession,
        subscribe: bool,
    ) -> Result<Connection, SessionError> {
        self.call(|reply| Request::Join {
            command,
            subscribe,
            reply,
        })
        .await
    }

    /// Closes a connection. Returns the participant it belonged to.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unavailable` if the coordinator has stopped.
    pub async fn leave(&self, command: LeaveSession) -> Result<Option<ParticipantId>, SessionError> {
        self.call(|reply| Request::Leave { command, reply }).await
    }

    /// Casts a vote on the node that is current when the request is applied.
    ///
    /// # Errors
    ///
    /// Returns the conditions of [`SessionState::cast_vote`] or
    /// `SessionError::Unavailable`.
    pub async fn cast_vote(&self, command: CastVote) -> Result<VoteReceipt, SessionError> {
        self.call(|reply| Request::Vote { command, reply }).await?
    }

    /// Confirms readiness and attempts to advance.
    ///
    /// # Errors
    ///
    /// Returns the conditions of [`SessionState::request_advance`] or
    /// `SessionError::Unavailable`.
    pub async fn request_advance(&self, command: RequestAdvance) -> Result<Advanced, SessionError> {
        self.call(|reply| Request::Advance { command, reply }).await?
    }

    /// Appends a chat message.
    ///
    /// # Errors
    ///
    /// Returns the conditions of [`SessionState::send_chat`] or
    /// `SessionError::Unavailable`.
    pub async fn send_chat(&self, command: SendChat) -> Result<ChatEntry, SessionError> {
        self.call(|reply| Request::Chat { command, reply }).await?
    }

    /// Reads the whole session state in one step.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unavailable` if the coordinator has stopped.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.call(|reply| Request::Snapshot { reply }).await
    }
}
