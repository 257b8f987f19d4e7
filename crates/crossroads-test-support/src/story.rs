//! Narrative fixtures.

use crossroads_core::participant::ParticipantId;
use crossroads_narrative::application::loader::parse_story;
use crossroads_narrative::domain::graph::NarrativeGraph;

const CROSSROADS: &str = r"
title: Crossroads
start: fork
nodes:
  - id: fork
    text: The road splits.
    choices:
      - text: Take X
        target: x_path
      - text: Take Y
        target: y_path
      - text: Take Z
        target: z_path
  - id: x_path
    text: The X road winds on.
    choices:
      - text: Keep walking
        target: end
  - id: y_path
    text: The Y road ends at a cliff.
  - id: z_path
    text: The Z road ends at a lake.
  - id: end
    text: You arrive.
";

const DANGLING: &str = r"
title: Broken
start: fork
nodes:
  - id: fork
    text: One road is unfinished.
    choices:
      - text: Unfinished road
        target: nowhere
      - text: Finished road
        target: end
  - id: end
    text: You arrive.
";

/// Story starting at `fork` with choices X (index 0 → `x_path`), Y (1 →
/// `y_path`) and Z (2 → `z_path`). `x_path` continues to the ending `end`.
///
/// # Panics
///
/// Panics if the fixture source is malformed.
#[must_use]
pub fn crossroads_story() -> NarrativeGraph {
    parse_story(CROSSROADS).expect("crossroads fixture parses")
}

/// Story whose first choice at `fork` points at the undefined node `nowhere`.
///
/// # Panics
///
/// Panics if the fixture source is malformed.
#[must_use]
pub fn dangling_story() -> NarrativeGraph {
    parse_story(DANGLING).expect("dangling fixture parses")
}

/// Shorthand for a valid participant id.
///
/// # Panics
///
/// Panics if `name` is not a valid display name.
#[must_use]
pub fn participant(name: &str) -> ParticipantId {
    ParticipantId::parse(name).expect("fixture participant name is valid")
}
