//! Breadth-first flattening
//!
//! Linearizes an upsert tree level by level. Consumers rely on the output
//! order: a node's root and parent are always emitted before the node, so
//! inserting rows in emission order satisfies every parent-before-child
//! foreign key.

use std::collections::HashSet;
use std::sync::Arc;

use super::errors::{StructuralError, UpsertResult};
use super::node::{NodeRef, UpsertNode};

/// One emitted node with its traversal context.
///
/// `root` and `parent` are `None` for top-level input nodes. For a child,
/// `parent` is its direct owner and `root` the top-most ancestor of its
/// branch.
#[derive(Debug, Clone)]
pub struct FlattenedNode {
    pub root: Option<NodeRef>,
    pub parent: Option<NodeRef>,
    pub node: NodeRef,
}

/// Flattens `roots` in breadth-first level order.
///
/// Each node identity is visited at most once; a node instance appearing
/// twice is a [`StructuralError::DuplicateNode`]. A level past `max_depth`
/// stops the traversal with [`StructuralError::MaxDepthExceeded`] naming
/// the offending frontier, rather than running until some unrelated
/// resource limit is hit.
pub fn flatten(roots: &[NodeRef], max_depth: usize) -> UpsertResult<Vec<FlattenedNode>> {
    let mut output = Vec::new();
    let mut seen: HashSet<*const UpsertNode> = HashSet::new();

    let mut level: Vec<FlattenedNode> = roots
        .iter()
        .map(|root| FlattenedNode {
            root: None,
            parent: None,
            node: Arc::clone(root),
        })
        .collect();
    let mut depth = 1usize;

    while !level.is_empty() {
        if depth > max_depth {
            return Err(StructuralError::MaxDepthExceeded {
                max_depth,
                frontier: level.iter().map(|entry| entry.node.describe()).collect(),
            });
        }

        let mut next = Vec::new();
        for entry in level {
            if !seen.insert(Arc::as_ptr(&entry.node)) {
                return Err(StructuralError::DuplicateNode {
                    node: entry.node.describe(),
                });
            }

            for child in &entry.node.children {
                // A top-level node is itself the root of its branch.
                let child_root = entry
                    .root
                    .clone()
                    .unwrap_or_else(|| Arc::clone(&entry.node));
                next.push(FlattenedNode {
                    root: Some(child_root),
                    parent: Some(Arc::clone(&entry.node)),
                    node: Arc::clone(child),
                });
            }
            output.push(entry);
        }

        level = next;
        depth += 1;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(id: &str) -> NodeRef {
        UpsertNode::new("sample", json!({ "external_id": id }))
    }

    fn branch(id: &str, children: Vec<NodeRef>) -> NodeRef {
        UpsertNode::with_children("sample", json!({ "external_id": id }), children)
    }

    fn ids(flat: &[FlattenedNode]) -> Vec<String> {
        flat.iter()
            .map(|e| e.node.payload["external_id"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_level_order_emission() {
        let c3 = leaf("C3");
        let c1 = branch("C1", vec![Arc::clone(&c3)]);
        let c2 = leaf("C2");
        let r = branch("R", vec![Arc::clone(&c1), Arc::clone(&c2)]);

        let flat = flatten(&[Arc::clone(&r)], 10).unwrap();
        assert_eq!(ids(&flat), vec!["R", "C1", "C2", "C3"]);

        // Top-level node has no root or parent.
        assert!(flat[0].root.is_none());
        assert!(flat[0].parent.is_none());

        // C1 and C2: root = parent = R.
        for entry in &flat[1..3] {
            assert!(Arc::ptr_eq(entry.root.as_ref().unwrap(), &r));
            assert!(Arc::ptr_eq(entry.parent.as_ref().unwrap(), &r));
        }

        // C3: root = R, parent = C1.
        assert!(Arc::ptr_eq(flat[3].root.as_ref().unwrap(), &r));
        assert!(Arc::ptr_eq(flat[3].parent.as_ref().unwrap(), &c1));
    }

    #[test]
    fn test_parents_always_precede_children() {
        let tree = branch(
            "a",
            vec![
                branch("b", vec![leaf("d"), leaf("e")]),
                branch("c", vec![leaf("f")]),
            ],
        );
        let flat = flatten(&[tree], 10).unwrap();

        for (i, entry) in flat.iter().enumerate() {
            if let Some(parent) = &entry.parent {
                let parent_pos = flat
                    .iter()
                    .position(|e| Arc::ptr_eq(&e.node, parent))
                    .unwrap();
                assert!(parent_pos < i);
            }
        }
    }

    #[test]
    fn test_multiple_roots() {
        let flat = flatten(&[leaf("r1"), leaf("r2")], 10).unwrap();
        assert_eq!(ids(&flat), vec!["r1", "r2"]);
        assert!(flat.iter().all(|e| e.root.is_none() && e.parent.is_none()));
    }

    #[test]
    fn test_duplicate_instance_is_structural_error() {
        let shared = leaf("shared");
        let tree = branch("root", vec![Arc::clone(&shared), Arc::clone(&shared)]);

        let err = flatten(&[tree], 10).unwrap_err();
        match err {
            StructuralError::DuplicateNode { node } => {
                assert_eq!(node, "sample 'shared'");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_equal_content_distinct_instances_allowed() {
        // Two separately allocated nodes with identical payloads are not
        // duplicates; identity is the allocation, not the content.
        let tree = branch("root", vec![leaf("same"), leaf("same")]);
        let flat = flatten(&[tree], 10).unwrap();
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn test_depth_limit_names_offending_frontier() {
        // Chain of 11 levels; the 11th level breaches max_depth = 10.
        let mut node = leaf("level11");
        for level in (1..=10).rev() {
            node = branch(&format!("level{level}"), vec![node]);
        }

        let err = flatten(&[node], 10).unwrap_err();
        match err {
            StructuralError::MaxDepthExceeded { max_depth, frontier } => {
                assert_eq!(max_depth, 10);
                assert_eq!(frontier, vec!["sample 'level11'"]);
            }
            other => panic!("expected depth error, got {other:?}"),
        }
    }

    #[test]
    fn test_depth_limit_boundary_is_inclusive() {
        let tree = branch("l1", vec![branch("l2", vec![leaf("l3")])]);
        assert!(flatten(&[Arc::clone(&tree)], 3).is_ok());
        assert!(flatten(&[tree], 2).is_err());
    }

    #[test]
    fn test_empty_input_flattens_to_empty() {
        let flat = flatten(&[], 10).unwrap();
        assert!(flat.is_empty());
    }
}
