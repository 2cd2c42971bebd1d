//! Flattened, renderer-facing model output.
//!
//! [`get_model`] walks a transform tree and produces an [`S3DModel`]: plain
//! arrays of transformed positions, normals, optional colors and triangle
//! indices per mesh, plus a material table. The output owns its data and has
//! no links back into the [`SceneGraph`](crate::node::SceneGraph).

mod normals;
mod prepare;

pub use normals::{calc_triangle_normals, triangle_normal};
pub use prepare::{get_model, MatList};

use crate::node::Appearance;
use crate::util::{BBox3f, Vec3};

/// Material entry of an [`S3DModel`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SMaterial {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub emissive: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub transparency: f32,
}

impl Default for SMaterial {
    fn default() -> Self {
        Self {
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            emissive: Vec3::ZERO,
            specular: Vec3::ZERO,
            shininess: 0.0,
            transparency: 0.0,
        }
    }
}

impl SMaterial {
    /// Neutral gray bound to shapes without an appearance.
    pub fn default_gray() -> Self {
        let gray = Vec3::splat(0.6);
        Self {
            ambient: gray,
            diffuse: gray,
            emissive: Vec3::ZERO,
            specular: gray,
            shininess: 0.05,
            transparency: 0.0,
        }
    }

    pub fn from_appearance(app: &Appearance) -> Self {
        Self {
            ambient: app.ambient.to_vec3(),
            diffuse: app.diffuse.to_vec3(),
            emissive: app.emissive.to_vec3(),
            specular: app.specular.to_vec3(),
            shininess: app.shininess(),
            transparency: app.transparency(),
        }
    }
}

/// One indexed triangle mesh with a single material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SMesh {
    pub vertices: Vec<Vec3>,
    /// Same length as `vertices`. Transformed but not renormalized.
    pub normals: Vec<Vec3>,
    /// Empty, or same length as `vertices`.
    pub colors: Vec<Vec3>,
    pub face_idx: Vec<u32>,
    pub material_idx: u32,
}

impl SMesh {
    #[inline]
    pub fn vertex_size(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_idx_size(&self) -> usize {
        self.face_idx.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.face_idx.len() / 3
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Positions as tightly packed `f32` triples.
    pub fn positions_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn normals_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn colors_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.face_idx)
    }

    pub fn bounds(&self) -> BBox3f {
        let mut b = BBox3f::EMPTY;
        for &v in &self.vertices {
            b.expand_by_point(v);
        }
        b
    }
}

/// A complete flattened model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct S3DModel {
    pub meshes: Vec<SMesh>,
    pub materials: Vec<SMaterial>,
}

impl S3DModel {
    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(SMesh::vertex_size).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(SMesh::triangle_count).sum()
    }

    /// Combined bounds of every mesh.
    pub fn bounds(&self) -> BBox3f {
        let mut b = BBox3f::EMPTY;
        for mesh in &self.meshes {
            let mb = mesh.bounds();
            if !mb.is_empty() {
                b.expand_by_point(mb.min);
                b.expand_by_point(mb.max);
            }
        }
        b
    }
}

/// Allocate an empty model.
pub fn new_3d_model() -> S3DModel {
    S3DModel::default()
}

/// Reset a mesh to the empty state.
pub fn init_smesh(mesh: &mut SMesh) {
    *mesh = SMesh::default();
}

/// Reset a material to all-zero.
pub fn init_3d_material(mat: &mut SMaterial) {
    *mat = SMaterial::default();
}

/// Release a mesh's arrays, keeping the value usable.
pub fn free_3d_mesh(mesh: &mut SMesh) {
    init_smesh(mesh);
}

/// Release every mesh and material of a model.
pub fn free_3d_model(model: &mut S3DModel) {
    model.meshes.iter_mut().for_each(free_3d_mesh);
    model.meshes.clear();
    model.materials.clear();
}

/// Release a model and clear the caller's slot.
pub fn destroy_3d_model(model: &mut Option<S3DModel>) {
    if let Some(m) = model.as_mut() {
        free_3d_model(m);
    }
    *model = None;
}
