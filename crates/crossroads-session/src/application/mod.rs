//! Coordinator actor and notification fan-out.

pub mod coordinator;
pub mod fanout;
