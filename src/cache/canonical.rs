//! Write-time canonicalization of shared nodes.
//!
//! A cache stream resolves references only backwards: a bare `[name]` tag
//! must name a node whose full payload appeared earlier. Before writing, the
//! tree is walked in stream order and every reference whose target has not
//! yet been reached as an owned node is promoted to ownership at that holder
//! with [`SceneGraph::swap_parent`]. The previous owner keeps a reference.

use std::collections::HashSet;

use tracing::{trace, warn};

use crate::node::{NodeId, SceneGraph};

/// Promote references that would otherwise be written before their target.
///
/// Returns the number of nodes that changed owner. A failed promotion is
/// logged and left for the writer to reject.
pub fn promote_unwritten_refs(graph: &mut SceneGraph, root: NodeId) -> usize {
    let mut reached = HashSet::new();
    let mut promoted = 0;
    visit(graph, root, &mut reached, &mut promoted);
    promoted
}

fn visit(graph: &mut SceneGraph, id: NodeId, reached: &mut HashSet<NodeId>, promoted: &mut usize) {
    if !reached.insert(id) {
        return;
    }

    for target in graph.references(id) {
        if reached.contains(&target) {
            continue;
        }
        if graph.swap_parent(target, id) {
            trace!("promoted shared {:?} node under its first writer", graph.kind(target));
            *promoted += 1;
        } else {
            warn!("could not promote a referenced node ahead of its owner");
        }
    }

    // re-read: promotion may have added owned children
    for child in graph.owned_children(id) {
        visit(graph, child, reached, promoted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Link;

    #[test]
    fn test_forward_reference_promoted() {
        let mut g = SceneGraph::new();
        let root = g.new_transform(None);
        let shape_a = g.new_shape(Some(root));
        let shape_b = g.new_shape(Some(root));
        let face_a = g.new_faceset(Some(shape_a));
        let face_b = g.new_faceset(Some(shape_b));
        // owned by the later face set, referenced by the earlier one
        let coords = g.new_coords(Some(face_b));
        assert!(g.add_ref_node(face_a, coords));

        assert_eq!(promote_unwritten_refs(&mut g, root), 1);
        assert_eq!(g.parent(coords), Some(face_a));
        assert_eq!(g.faceset(face_b).and_then(|f| f.coords()), Some(Link::Ref(coords)));
    }

    #[test]
    fn test_backward_reference_kept() {
        let mut g = SceneGraph::new();
        let root = g.new_transform(None);
        let shape_a = g.new_shape(Some(root));
        let shape_b = g.new_shape(Some(root));
        let face_a = g.new_faceset(Some(shape_a));
        let face_b = g.new_faceset(Some(shape_b));
        let coords = g.new_coords(Some(face_a));
        assert!(g.add_ref_node(face_b, coords));

        assert_eq!(promote_unwritten_refs(&mut g, root), 0);
        assert_eq!(g.parent(coords), Some(face_a));
    }

    #[test]
    fn test_outside_reference_pulled_in() {
        let mut g = SceneGraph::new();
        let root = g.new_transform(None);
        let shape = g.new_shape(Some(root));
        let app = g.new_appearance(None);
        assert!(g.add_ref_node(shape, app));

        assert_eq!(promote_unwritten_refs(&mut g, root), 1);
        assert_eq!(g.parent(app), Some(shape));
        assert!(g.references(shape).is_empty());
    }

    #[test]
    fn test_child_transform_references_sibling_shape() {
        let mut g = SceneGraph::new();
        let root = g.new_transform(None);
        let sub = g.new_transform(Some(root));
        // root writes child transforms before child shapes
        let shape = g.new_shape(Some(root));
        assert!(g.add_ref_node(sub, shape));

        assert_eq!(promote_unwritten_refs(&mut g, root), 1);
        assert_eq!(g.parent(shape), Some(sub));
        assert_eq!(g.references(root), vec![shape]);
    }
}
