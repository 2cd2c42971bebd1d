//! Integration tests for flattening scene graphs into render models.

mod common;

use scenegraph::cache::{read_cache, write_cache, CacheWriteOptions};
use scenegraph::mesh::{calc_triangle_normals, destroy_3d_model, get_model, SMaterial};
use scenegraph::node::SceneGraph;
use scenegraph::util::{DVec3, Point3, UnitVector3, Vec3};

use tempfile::tempdir;

#[test]
fn test_translated_unit_square() {
    let mut g = SceneGraph::new();
    let root = g.new_transform(None);
    if let Some(t) = g.transform_mut(root) {
        t.set_translation(DVec3::new(10.0, 0.0, 0.0));
    }
    let shape = g.new_shape(Some(root));
    common::square_faceset(&mut g, shape);

    let model = get_model(&g, root).expect("model");
    assert_eq!(model.mesh_count(), 1);
    let mesh = &model.meshes[0];
    let expected: Vec<Vec3> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
        .iter()
        .map(|&(x, y)| Vec3::new(x + 10.0, y, 0.0))
        .collect();
    assert_eq!(mesh.vertices, expected);
    assert_eq!(mesh.face_idx, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(mesh.material_idx, 0);
    assert_eq!(model.materials[0], SMaterial::default_gray());
}

#[test]
fn test_model_survives_cache_round_trip() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("asm.cache");
    let mut g = SceneGraph::new();
    let asm = common::assembly(&mut g);
    let before = get_model(&g, asm.root).expect("model");

    write_cache(&mut g, asm.root, &path, &CacheWriteOptions::default()).expect("write");
    let loaded = read_cache(&path).expect("read");
    let after = get_model(&loaded.graph, loaded.root).expect("model");

    assert_eq!(before, after);
}

#[test]
fn test_assembly_instances_and_materials() {
    let mut g = SceneGraph::new();
    let asm = common::assembly(&mut g);
    let mut model = Some(get_model(&g, asm.root).expect("model"));

    let m = model.as_ref().expect("model");
    // part, its instance, and the shape sharing coordinates
    assert_eq!(m.mesh_count(), 3);
    // gray default plus one shared appearance
    assert_eq!(m.material_count(), 2);
    assert!(m.meshes.iter().all(|mesh| mesh.material_idx == 1));
    assert!(m.meshes[0].has_colors());
    assert!(!m.meshes[2].has_colors());
    assert_eq!(m.meshes[2].triangle_count(), 1);

    // the instance is the part lifted by 10 along z
    for (a, b) in m.meshes[0].vertices.iter().zip(&m.meshes[1].vertices) {
        assert!((*b - *a - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-5);
    }

    destroy_3d_model(&mut model);
    assert!(model.is_none());
}

#[test]
fn test_degenerate_triangle_normal_fallback() {
    let p = Point3::new(3.0, 3.0, 3.0);
    let coords = [p, p + DVec3::splat(1e-10), p - DVec3::splat(1e-10)];
    let normals = calc_triangle_normals(&coords, &[0, 1, 2]).expect("normals");
    for n in normals {
        assert_eq!(n, UnitVector3::Z);
    }
}
