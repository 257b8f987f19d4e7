//! Chat Log.

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use crossroads_core::participant::{ParticipantId, SYSTEM_SPEAKER};
use serde::{Deserialize, Serialize};

/// One chat line. Session announcements use the reserved system speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Display name of the speaker, or [`SYSTEM_SPEAKER`].
    pub speaker: String,
    /// Whether this is a session announcement.
    pub system: bool,
    /// Message body.
    pub text: String,
    /// When the entry was appended.
    pub sent_at: DateTime<Utc>,
}

impl ChatEntry {
    /// A message written by a participant.
    #[must_use]
    pub fn from_participant(speaker: &ParticipantId, text: String, sent_at: DateTime<Utc>) -> Self {
        Self {
            speaker: speaker.to_string(),
            system: false,
            text,
            sent_at,
        }
    }

    /// A session-level announcement.
    #[must_use]
    pub fn system(text: String, sent_at: DateTime<Utc>) -> Self {
        Self {
            speaker: SYSTEM_SPEAKER.to_owned(),
            system: true,
            text,
            sent_at,
        }
    }
}

impl fmt::Display for ChatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.speaker, self.text)
    }
}

/// Append-only ordered chat history, optionally bounded.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: Option<NonZeroUsize>,
}

impl ChatLog {
    /// An unbounded log.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A log that keeps at most `capacity` entries, evicting the oldest.
    #[must_use]
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.get()),
            capacity: Some(capacity),
        }
    }

    /// Appends an entry.
    pub fn append(&mut self, entry: ChatEntry) {
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity.get() {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
    }

    /// Copy of the retained entries, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }

}
