//! Participant identity.
//!
//! Names are self-asserted by clients. Parsing only guarantees the name is
//! displayable and cannot impersonate the system speaker.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Speaker tag reserved for session-level chat announcements.
pub const SYSTEM_SPEAKER: &str = "SYSTEM";

/// Longest accepted display name, in characters.
pub const MAX_NAME_CHARS: usize = 32;

/// Display name identifying a participant for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Validates a client-supplied display name.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::HandshakeRejected` if the trimmed name is empty,
    /// too long, contains control characters, or equals [`SYSTEM_SPEAKER`].
    pub fn parse(name: &str) -> Result<Self, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::HandshakeRejected(
                "display name is empty".to_owned(),
            ));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(SessionError::HandshakeRejected(format!(
                "display name is longer than {MAX_NAME_CHARS} characters"
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(SessionError::HandshakeRejected(
                "display name contains control characters".to_owned(),
            ));
        }
        if name.eq_ignore_ascii_case(SYSTEM_SPEAKER) {
            return Err(SessionError::HandshakeRejected(format!(
                "`{name}` is reserved"
            )));
        }
        Ok(Self(name.to_owned()))
    }

    /// Returns the display name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ParticipantId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
