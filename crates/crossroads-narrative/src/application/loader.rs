//! YAML story loading.
//!
//! A story file holds a title, the start node id and an ordered list of
//! nodes. The graph's version hash is the SHA-256 of the raw source.

use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::domain::graph::NarrativeGraph;
use crate::domain::node::{NarrativeNode, NodeId};
use crate::error::NarrativeError;

const BUNDLED_STORY: &str = include_str!("../../stories/dark_forest.yaml");

#[derive(Debug, Deserialize)]
struct StoryDocument {
    title: String,
    start: NodeId,
    nodes: Vec<NarrativeNode>,
}

/// Parses a story from YAML source.
///
/// # Errors
///
/// Returns `NarrativeError::Parse` for malformed YAML and the structural
/// errors of [`NarrativeGraph::new`].
pub fn parse_story(source: &str) -> Result<NarrativeGraph, NarrativeError> {
    let document: StoryDocument = serde_yaml::from_str(source)?;
    let graph = NarrativeGraph::new(
        document.title,
        document.start,
        document.nodes,
        version_hash(source),
    )?;

    for (node, index, target) in graph.dangling_targets() {
        warn!(%node, index, %target, "choice leads to a node the story does not define");
    }

    Ok(graph)
}

/// Reads and parses a story file.
///
/// # Errors
///
/// Returns `NarrativeError::Io` if the file cannot be read, otherwise the
/// errors of [`parse_story`].
pub fn load_story(path: &Path) -> Result<NarrativeGraph, NarrativeError> {
    let source = std::fs::read_to_string(path).map_err(|source| NarrativeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let graph = parse_story(&source)?;
    info!(
        path = %path.display(),
        title = graph.title(),
        nodes = graph.len(),
        "loaded story"
    );
    Ok(graph)
}

/// The demo story shipped with the crate.
///
/// # Errors
///
/// Only fails if the bundled file is malformed.
pub fn bundled_story() -> Result<NarrativeGraph, NarrativeError> {
    parse_story(BUNDLED_STORY)
}

fn version_hash(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}
