//! Crossroads — Narrative Graph.
//!
//! The static, read-only mapping from node identifier to node content that a
//! session walks through. Stories are authored as YAML and loaded once at
//! process start.

pub mod application;
pub mod domain;
pub mod error;
