//! # Structural Errors
//!
//! Fatal-for-the-request errors raised while flattening an upsert tree.
//! The message identifies the offending node or frontier.

use thiserror::Error;

/// Result type for upsert-tree operations
pub type UpsertResult<T> = Result<T, StructuralError>;

/// Malformed upsert-tree structure
#[derive(Debug, Clone, Error)]
pub enum StructuralError {
    /// The same node instance appears twice (cross-linked under two
    /// parents, or appended to its own ancestor); never silently
    /// deduplicated
    #[error("node {node} appears more than once in the upsert tree")]
    DuplicateNode { node: String },

    /// The tree is deeper than the configured maximum
    #[error(
        "upsert tree exceeds maximum depth {max_depth}; offending nodes: {}",
        .frontier.join(", ")
    )]
    MaxDepthExceeded {
        max_depth: usize,
        frontier: Vec<String>,
    },
}
