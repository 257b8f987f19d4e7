//! Story loading errors.

use thiserror::Error;

/// Errors raised while building a narrative graph.
#[derive(Debug, Error)]
pub enum NarrativeError {
    /// The story file could not be read.
    #[error("failed to read story file `{path}`: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The story source is not valid YAML for the story format.
    #[error("failed to parse story: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The declared start node is not part of the graph.
    #[error("start node `{0}` does not exist")]
    MissingStart(String),

    /// Two nodes share an identifier.
    #[error("node `{0}` is defined more than once")]
    DuplicateNode(String),
}
