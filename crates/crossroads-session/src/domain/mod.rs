//! Session domain: registry, ballots, chat log and the state machine.

pub mod chat;
pub mod commands;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod snapshot;
pub mod state;
