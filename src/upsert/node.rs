//! Upsert tree nodes

use std::sync::Arc;

use serde_json::Value;

/// Shared reference to a node.
///
/// Children are held through `Arc` so a node's identity is its allocation:
/// the flattener can detect the same instance linked in twice, which plain
/// ownership would make unrepresentable and content comparison would
/// wrongly deduplicate.
pub type NodeRef = Arc<UpsertNode>;

/// One node of a nested upsert request: an entity payload plus its child
/// upserts. Ownership of children is exclusive to the parent for the
/// duration of one request.
#[derive(Debug)]
pub struct UpsertNode {
    /// Entity kind, e.g. "sample".
    pub kind: String,
    /// Payload forwarded untouched to the entity layer.
    pub payload: Value,
    pub children: Vec<NodeRef>,
}

impl UpsertNode {
    /// Creates a leaf node.
    pub fn new(kind: impl Into<String>, payload: Value) -> NodeRef {
        Arc::new(Self {
            kind: kind.into(),
            payload,
            children: Vec::new(),
        })
    }

    /// Creates a node with children.
    pub fn with_children(
        kind: impl Into<String>,
        payload: Value,
        children: Vec<NodeRef>,
    ) -> NodeRef {
        Arc::new(Self {
            kind: kind.into(),
            payload,
            children,
        })
    }

    /// Short human-readable description used in structural errors.
    ///
    /// Prefers the payload's external id, then name, then id.
    pub fn describe(&self) -> String {
        let label = ["external_id", "name", "id"]
            .iter()
            .find_map(|key| self.payload.get(key))
            .and_then(Value::as_str);
        match label {
            Some(label) => format!("{} '{}'", self.kind, label),
            None => self.kind.clone(),
        }
    }
}
