//! Integration tests for the node ownership and reference protocol.

mod common;

use scenegraph::node::{Link, NodeData, NodeHandle, NodeKind, SceneGraph};

#[test]
fn test_parent_type_invariant_for_every_kind() {
    for kind in NodeKind::ALL {
        for parent_kind in NodeKind::ALL {
            if parent_kind == kind.parent_kind() {
                continue;
            }
            let mut g = SceneGraph::new();
            let parent = g.new_node(NodeData::empty(parent_kind), None);
            let before = g.owned_children(parent);

            let child = g.new_node(NodeData::empty(kind), Some(parent));
            assert_eq!(g.parent(child), None, "{kind} under {parent_kind}");
            assert_eq!(g.owned_children(parent), before);

            assert!(!g.set_parent(child, Some(parent), true), "{kind} under {parent_kind}");
            assert_eq!(g.owned_children(parent), before);
        }
    }
}

#[test]
fn test_accepted_parent_for_every_kind() {
    for kind in NodeKind::ALL {
        let mut g = SceneGraph::new();
        let parent = g.new_node(NodeData::empty(kind.parent_kind()), None);
        let child = g.new_node(NodeData::empty(kind), Some(parent));
        assert_eq!(g.parent(child), Some(parent), "{kind}");
        assert_eq!(g.owned_children(parent), vec![child]);
    }
}

#[test]
fn test_delete_cascade_across_holders() {
    let mut g = SceneGraph::new();
    let asm = common::assembly(&mut g);
    let handle = NodeHandle::new();
    assert!(g.associate_wrapper(asm.appearance, &handle));

    assert!(g.delete_node(asm.appearance));
    assert!(!handle.is_valid());
    assert_eq!(g.shape(asm.shape_a).and_then(|s| s.appearance()), None);
    assert_eq!(g.shape(asm.shape_b).and_then(|s| s.appearance()), None);
}

#[test]
fn test_deleting_part_clears_instance_reference() {
    let mut g = SceneGraph::new();
    let asm = common::assembly(&mut g);
    let before = g.len();

    assert!(g.delete_node(asm.part));
    // part, shape, appearance, face set and its four leaves
    assert_eq!(g.len(), before - 8);
    assert!(g.transform(asm.instance).is_some_and(|t| t.ref_transforms().is_empty()));
    // shape_b lost every reference into the deleted subtree
    let face_b = g.shape(asm.shape_b).and_then(|s| s.faceset()).map(|l| l.id());
    let face_b = face_b.expect("faceset");
    assert!(g.references(face_b).is_empty());
    assert!(g.faceset(face_b).and_then(|f| f.coord_index()).is_some());
}

#[test]
fn test_validate_memo_survives_data_edits() {
    let mut g = SceneGraph::new();
    let root = g.new_transform(None);
    let shape = g.new_shape(Some(root));
    let face = common::square_faceset(&mut g, shape);
    assert!(g.validate(face));

    let coords = g.faceset(face).and_then(|f| f.coords()).map(|l| l.id()).expect("coords");
    if let Some(c) = g.coords_mut(coords) {
        c.set_points(Vec::new());
    }
    assert!(g.validate(face));

    // a slot change drops the memo
    let colors = g.new_colors(Some(face));
    assert!(!g.validate(face));
    assert!(g.delete_node(colors));
    assert!(!g.validate(face));
}

#[test]
fn test_swap_parent_keeps_reference_at_old_owner() {
    let mut g = SceneGraph::new();
    let asm = common::assembly(&mut g);
    let face_b = g
        .shape(asm.shape_b)
        .and_then(|s| s.faceset())
        .map(|l| l.id())
        .expect("faceset");
    let face_a = g.parent(asm.coords).expect("owner");

    assert!(g.swap_parent(asm.coords, face_b));
    assert_eq!(g.faceset(face_b).and_then(|f| f.coords()), Some(Link::Owned(asm.coords)));
    assert_eq!(g.faceset(face_a).and_then(|f| f.coords()), Some(Link::Ref(asm.coords)));
    assert_eq!(g.node(asm.coords).map(|n| n.back_refs().to_vec()), Some(vec![face_a]));
}

#[test]
fn test_swap_parent_refuses_reference_to_new_ancestor() {
    let mut g = SceneGraph::new();
    let root = g.new_transform(None);
    let ta = g.new_transform(Some(root));
    let tb = g.new_transform(Some(root));
    let tc = g.new_transform(Some(tb));
    assert!(g.add_ref_node(ta, tb));
    assert!(g.add_ref_node(tc, ta));

    // tc would end up referencing its own grandparent
    assert!(!g.swap_parent(tb, ta));
    assert_eq!(g.parent(tb), Some(root));
    assert_eq!(g.transform(root).map(|t| t.transforms().to_vec()), Some(vec![ta, tb]));
    assert_eq!(g.references(ta), vec![tb]);
    assert_eq!(g.references(tc), vec![ta]);

    // a parentless subtree is checked the same way
    let loose = g.new_transform(None);
    assert!(g.add_ref_node(loose, ta));
    assert!(!g.swap_parent(loose, ta));
    assert_eq!(g.parent(loose), None);
}

#[test]
fn test_find_node_through_references() {
    let mut g = SceneGraph::new();
    let asm = common::assembly(&mut g);
    g.reset_node_index();
    g.rename_nodes(asm.root);

    let name = g.node(asm.coords).and_then(|n| n.name()).expect("name").to_string();
    assert_eq!(name, "COORD_1");
    assert_eq!(g.find_node(asm.shape_b, &name, None), Some(asm.coords));
    assert_eq!(g.find_node(asm.instance, &name, None), Some(asm.coords));
    assert_eq!(g.find_node(asm.root, "COORD_9", None), None);
}
