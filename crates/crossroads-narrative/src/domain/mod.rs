//! Narrative domain types.

pub mod graph;
pub mod node;
