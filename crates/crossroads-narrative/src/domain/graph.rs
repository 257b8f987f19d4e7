//! The narrative graph.

use std::collections::HashMap;

use crate::domain::node::{NarrativeNode, NodeId};
use crate::error::NarrativeError;

/// Immutable story: every node keyed by id, plus the node sessions start on.
#[derive(Debug, Clone)]
pub struct NarrativeGraph {
    title: String,
    start: NodeId,
    nodes: HashMap<NodeId, NarrativeNode>,
    version_hash: String,
}

impl NarrativeGraph {
    /// Builds a graph from its nodes.
    ///
    /// Only structural integrity is checked: unique ids and an existing start
    /// node. Choices pointing at unknown nodes are accepted and can be listed
    /// with [`NarrativeGraph::dangling_targets`].
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::DuplicateNode` if two nodes share an id and
    /// `NarrativeError::MissingStart` if `start` is not among `nodes`.
    pub fn new(
        title: impl Into<String>,
        start: NodeId,
        nodes: impl IntoIterator<Item = NarrativeNode>,
        version_hash: impl Into<String>,
    ) -> Result<Self, NarrativeError> {
        let mut by_id = HashMap::new();
        for node in nodes {
            let id = node.id.clone();
            if by_id.insert(id.clone(), node).is_some() {
                return Err(NarrativeError::DuplicateNode(id.to_string()));
            }
        }
        if !by_id.contains_key(&start) {
            return Err(NarrativeError::MissingStart(start.to_string()));
        }
        Ok(Self {
            title: title.into(),
            start,
            nodes: by_id,
            version_hash: version_hash.into(),
        })
    }

    /// Story title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The node every session starts on.
    #[must_use]
    pub fn start(&self) -> &NodeId {
        &self.start
    }

    /// Hex SHA-256 of the story source this graph was built from.
    #[must_use]
    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&NarrativeNode> {
        self.nodes.get(id)
    }

    /// The start node. Always present by construction.
    #[must_use]
    pub fn start_node(&self) -> &NarrativeNode {
        &self.nodes[&self.start]
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A graph always holds at least its start node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Sorted `(node, choice index, missing target)` triples for choices that
    /// lead nowhere.
    #[must_use]
    pub fn dangling_targets(&self) -> Vec<(NodeId, usize, NodeId)> {
        let mut dangling: Vec<_> = self
            .nodes
            .values()
            .flat_map(|node| {
                node.choices
                    .iter()
                    .enumerate()
                    .filter(|(_, choice)| !self.nodes.contains_key(&choice.target))
                    .map(|(index, choice)| (node.id.clone(), index, choice.target.clone()))
            })
            .collect();
        dangling.sort();
        dangling
    }
}
