//! Crossroads Core — shared vocabulary for the group-story coordinator.
//!
//! Participant identity, the coordinator error taxonomy, and the clock,
//! command and event abstractions every other crate builds on. Contains no
//! I/O and no async code.

pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod participant;
