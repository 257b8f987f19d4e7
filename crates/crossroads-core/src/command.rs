//! Command abstractions.

use uuid::Uuid;

use crate::participant::ParticipantId;

/// Trait implemented by every request that mutates session state.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID carried into the notifications the command produces.
    fn correlation_id(&self) -> Uuid;

    /// The participant on whose behalf the command runs.
    fn participant(&self) -> &ParticipantId;
}
