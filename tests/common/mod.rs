//! Shared model builders for integration tests.

#![allow(dead_code)]

use scenegraph::node::{NodeId, SceneGraph};
use scenegraph::util::{Color, DVec3, Point3, UnitVector3};

/// Face set with a unit square in the XY plane, normals computed.
pub fn square_faceset(g: &mut SceneGraph, shape: NodeId) -> NodeId {
    let face = g.new_faceset(Some(shape));
    let coords = g.new_coords(Some(face));
    if let Some(c) = g.coords_mut(coords) {
        c.set_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
    }
    let idx = g.new_coord_index(Some(face));
    if let Some(i) = g.coord_index_mut(idx) {
        i.set_indices(vec![0, 1, 2, 0, 2, 3]);
    }
    assert!(g.calc_normals(face).is_some());
    face
}

pub struct Assembly {
    pub root: NodeId,
    pub part: NodeId,
    pub instance: NodeId,
    pub shape_a: NodeId,
    pub shape_b: NodeId,
    pub coords: NodeId,
    pub appearance: NodeId,
}

/// Two-level model with shared data:
///
/// - `part` owns `shape_a` (square, colored, red appearance)
/// - `instance` references `part` with a translation
/// - `shape_b`, directly under the root, shares `shape_a`'s coordinates,
///   normals and appearance by reference
pub fn assembly(g: &mut SceneGraph) -> Assembly {
    let root = g.new_transform(None);
    let part = g.new_transform(Some(root));
    if let Some(t) = g.transform_mut(part) {
        t.set_rotation(UnitVector3::new(0.0, 0.0, 1.0), 0.25);
        t.set_scale(DVec3::new(1.0, 2.0, 1.0));
        t.set_center(DVec3::new(0.5, 0.5, 0.0));
    }

    let shape_a = g.new_shape(Some(part));
    let appearance = g.new_appearance(Some(shape_a));
    if let Some(a) = g.appearance_mut(appearance) {
        a.set_diffuse(Color::new(0.8, 0.1, 0.1));
        a.set_specular(Color::new(0.2, 0.2, 0.2));
        assert!(a.set_shininess(0.4));
        assert!(a.set_transparency(0.25));
    }
    let face_a = square_faceset(g, shape_a);
    let colors = g.new_colors(Some(face_a));
    if let Some(c) = g.colors_mut(colors) {
        c.set_colors(vec![Color::new(1.0, 0.0, 0.0); 4]);
    }
    let coords = g
        .faceset(face_a)
        .and_then(|f| f.coords())
        .map(|l| l.id())
        .expect("coords");
    let normals = g
        .faceset(face_a)
        .and_then(|f| f.normals())
        .map(|l| l.id())
        .expect("normals");

    let instance = g.new_transform(Some(root));
    if let Some(t) = g.transform_mut(instance) {
        t.set_translation(DVec3::new(0.0, 0.0, 10.0));
    }
    assert!(g.add_ref_node(instance, part));

    let shape_b = g.new_shape(Some(root));
    assert!(g.add_ref_node(shape_b, appearance));
    let face_b = g.new_faceset(Some(shape_b));
    assert!(g.add_ref_node(face_b, coords));
    assert!(g.add_ref_node(face_b, normals));
    let idx_b = g.new_coord_index(Some(face_b));
    if let Some(i) = g.coord_index_mut(idx_b) {
        i.set_indices(vec![0, 2, 1]);
    }

    Assembly { root, part, instance, shape_a, shape_b, coords, appearance }
}

/// Per-face-set counts `(coords, indices, normals, colors)` in traversal order,
/// following owned and referenced links.
pub fn faceset_counts(g: &SceneGraph, root: NodeId) -> Vec<(usize, usize, usize, usize)> {
    let mut out = Vec::new();
    collect_counts(g, root, &mut out);
    out
}

fn collect_counts(g: &SceneGraph, id: NodeId, out: &mut Vec<(usize, usize, usize, usize)>) {
    if let Some(t) = g.transform(id) {
        for &c in t.transforms().iter().chain(t.ref_transforms()) {
            collect_counts(g, c, out);
        }
        for &s in t.shapes().iter().chain(t.ref_shapes()) {
            collect_counts(g, s, out);
        }
    } else if let Some(s) = g.shape(id) {
        if let Some(f) = s.faceset() {
            collect_counts(g, f.id(), out);
        }
    } else if let Some(f) = g.faceset(id) {
        let coords = f.coords().and_then(|l| g.coords(l.id())).map_or(0, |c| c.len());
        let index = f.coord_index().and_then(|i| g.coord_index(i)).map_or(0, |i| i.len());
        let normals = f.normals().and_then(|l| g.normals(l.id())).map_or(0, |n| n.len());
        let colors = f.colors().and_then(|l| g.colors(l.id())).map_or(0, |c| c.len());
        out.push((coords, index, normals, colors));
    }
}

/// Number of shapes reachable from `root`, counting each instance.
pub fn shape_count(g: &SceneGraph, root: NodeId) -> usize {
    let Some(t) = g.transform(root) else {
        return 0;
    };
    let nested: usize = t
        .transforms()
        .iter()
        .chain(t.ref_transforms())
        .map(|&c| shape_count(g, c))
        .sum();
    nested + t.shapes().len() + t.ref_shapes().len()
}
