//! Shared test fixtures for the Crossroads coordinator.

mod clock;
mod story;

pub use clock::{FixedClock, fixed_now};
pub use story::{crossroads_story, dangling_story, participant};
