//! Notification Fan-out.
//!
//! Every subscribed connection owns a bounded channel. Publishing never
//! waits: a full channel drops the event for that subscriber only, a closed
//! channel removes the subscriber. Neither affects other subscribers or the
//! operation that produced the event. Clients that miss events recover by
//! fetching a snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use crossroads_core::event::DomainEvent;
use crossroads_core::participant::ParticipantId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::domain::events::SessionEvent;
use crate::domain::registry::ConnectionId;

/// Receiving end handed to a subscribed connection.
pub type EventReceiver = mpsc::Receiver<Arc<SessionEvent>>;

#[derive(Debug)]
struct Subscriber {
    participant: ParticipantId,
    sender: mpsc::Sender<Arc<SessionEvent>>,
}

/// Outcome of publishing one event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that accepted the event.
    pub delivered: usize,
    /// Subscribers whose buffer was full.
    pub dropped: usize,
    /// Subscribers found closed and removed.
    pub pruned: usize,
}

/// Registry of push channels, one per subscribed connection.
#[derive(Debug)]
pub struct Fanout {
    subscribers: HashMap<ConnectionId, Subscriber>,
    buffer: usize,
}

impl Fanout {
    /// Creates a fan-out whose channels hold up to `buffer` pending events.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: HashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Opens a push channel for a connection, replacing any previous one.
    pub fn subscribe(
        &mut self,
        connection: ConnectionId,
        participant: ParticipantId,
    ) -> EventReceiver {
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.subscribers.insert(
            connection,
            Subscriber {
                participant,
                sender,
            },
        );
        receiver
    }

    /// Drops a connection's push channel. Returns `true` if one existed.
    pub fn unsubscribe(&mut self, connection: ConnectionId) -> bool {
        self.subscribers.remove(&connection).is_some()
    }

    /// Number of open push channels.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Offers the event to every subscriber without waiting.
    pub fn publish(&mut self, event: &Arc<SessionEvent>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();

        for (connection, subscriber) in &self.subscribers {
            match subscriber.sender.try_send(Arc::clone(event)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    warn!(
                        %connection,
                        participant = %subscriber.participant,
                        event_type = event.event_type(),
                        "subscriber buffer full, dropping notification"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(
                        %connection,
                        participant = %subscriber.participant,
                        "subscriber channel closed, removing"
                    );
                    closed.push(*connection);
                }
            }
        }

        for connection in closed {
            self.subscribers.remove(&connection);
            report.pruned += 1;
        }

        debug!(
            event_type = event.event_type(),
            delivered = report.delivered,
            dropped = report.dropped,
            pruned = report.pruned,
            "notification fanned out"
        );
        report
    }
}
