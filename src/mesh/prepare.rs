//! Scene-graph to [`S3DModel`] flattening.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::node::{NodeId, NodeKind, SceneGraph};
use crate::util::DMat4;

use super::{S3DModel, SMaterial, SMesh};

/// Appearance-to-material-index table shared by one flattening pass.
///
/// Index 0 is always the neutral gray used by shapes without an appearance;
/// each distinct appearance node gets the next index on first sight.
#[derive(Debug)]
pub struct MatList {
    index: HashMap<NodeId, u32>,
    materials: Vec<SMaterial>,
}

impl Default for MatList {
    fn default() -> Self {
        Self::new()
    }
}

impl MatList {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            materials: vec![SMaterial::default_gray()],
        }
    }

    /// Material index for an appearance node, registering it if new.
    pub fn material_index(&mut self, graph: &SceneGraph, appearance: Option<NodeId>) -> u32 {
        let Some(app_id) = appearance else {
            return 0;
        };
        let Some(app) = graph.appearance(app_id) else {
            warn!("shape appearance slot does not hold an appearance; using default material");
            return 0;
        };
        if let Some(&idx) = self.index.get(&app_id) {
            return idx;
        }
        let idx = self.materials.len() as u32;
        self.materials.push(SMaterial::from_appearance(app));
        self.index.insert(app_id, idx);
        idx
    }

    #[inline]
    pub fn materials(&self) -> &[SMaterial] {
        &self.materials
    }

    pub fn into_materials(self) -> Vec<SMaterial> {
        self.materials
    }
}

struct Prepare<'a> {
    graph: &'a SceneGraph,
    mats: MatList,
    meshes: Vec<SMesh>,
    /// Transforms on the current path; guards against reference loops.
    active: HashSet<NodeId>,
}

impl Prepare<'_> {
    fn transform(&mut self, id: NodeId, parent: &DMat4) {
        let g = self.graph;
        let Some(t) = g.transform(id) else {
            return;
        };
        if !self.active.insert(id) {
            warn!("transform reached twice on one path; skipping loop");
            return;
        }

        let tx = *parent * t.local_matrix();
        let children: Vec<NodeId> = t.transforms().iter().chain(t.ref_transforms()).copied().collect();
        let shapes: Vec<NodeId> = t.shapes().iter().chain(t.ref_shapes()).copied().collect();

        for child in children {
            self.transform(child, &tx);
        }
        for shape in shapes {
            self.shape(shape, &tx);
        }

        self.active.remove(&id);
    }

    fn shape(&mut self, id: NodeId, tx: &DMat4) {
        let g = self.graph;
        let Some(shape) = g.shape(id) else {
            return;
        };
        let Some(face) = shape.faceset().map(|l| l.id()) else {
            trace!("shape without face set skipped");
            return;
        };
        if !g.validate(face) {
            debug!("invalid face set skipped");
            return;
        }
        let material = self.mats.material_index(g, shape.appearance().map(|l| l.id()));

        if let Some(mut mesh) = self.flatten(face, tx) {
            mesh.material_idx = material;
            self.meshes.push(mesh);
        }
    }

    /// Compact the vertices a face set actually uses and apply `tx`.
    fn flatten(&self, face: NodeId, tx: &DMat4) -> Option<SMesh> {
        let g = self.graph;
        let fs = g.faceset(face)?;
        let points = g.coords(fs.coords()?.id())?.points();
        let index = g.coord_index(fs.coord_index()?)?.indices();
        let normals = g.normals(fs.normals()?.id())?.vectors();
        let colors = fs.colors().and_then(|l| g.colors(l.id())).map(|c| c.colors());

        // validity is cached, so the arrays may have changed since it was computed
        let n = points.len();
        if normals.len() < n || colors.is_some_and(|c| c.len() < n) {
            warn!("face set arrays shrank after validation; skipped");
            return None;
        }
        if index.iter().any(|&i| i < 0 || i as usize >= n) {
            warn!("face set index out of range after validation; skipped");
            return None;
        }

        let mut remap: Vec<Option<u32>> = vec![None; points.len()];
        let mut mesh = SMesh::default();
        mesh.face_idx.reserve(index.len());

        for &i in index {
            let old = i as usize;
            let new = match remap[old] {
                Some(n) => n,
                None => {
                    let n = mesh.vertices.len() as u32;
                    remap[old] = Some(n);

                    mesh.vertices.push(tx.transform_point3(points[old]).as_vec3());
                    mesh.normals.push(tx.transform_vector3(normals[old].get()).as_vec3());
                    if let Some(c) = colors {
                        mesh.colors.push(c[old].to_vec3());
                    }
                    n
                }
            };
            mesh.face_idx.push(new);
        }

        if mesh.vertices.len() < 3 {
            debug!("face set with {} used vertices dropped", mesh.vertices.len());
            return None;
        }
        Some(mesh)
    }
}

/// Flatten the tree under a transform into renderer-ready meshes.
///
/// Shapes without a face set, and face sets that fail validation, are
/// skipped. Returns `None` when `root` is not a transform or nothing
/// renderable was found.
pub fn get_model(graph: &SceneGraph, root: NodeId) -> Option<S3DModel> {
    if graph.kind(root) != Some(NodeKind::Transform) {
        warn!("get_model requires a transform root");
        return None;
    }

    let mut prep = Prepare {
        graph,
        mats: MatList::new(),
        meshes: Vec::new(),
        active: HashSet::new(),
    };
    prep.transform(root, &DMat4::IDENTITY);

    if prep.meshes.is_empty() {
        debug!("get_model: no renderable meshes");
        return None;
    }
    debug!(
        "get_model: {} meshes, {} materials",
        prep.meshes.len(),
        prep.mats.materials().len()
    );
    Some(S3DModel {
        meshes: prep.meshes,
        materials: prep.mats.into_materials(),
    })
}
