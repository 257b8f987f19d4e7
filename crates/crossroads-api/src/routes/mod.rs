//! Route modules.

pub mod health;
pub mod session;
pub mod story;
pub mod ws;
