//! Leaf data nodes held by a face set: coordinates, normals, colors and the
//! triangle index list.

use tracing::{debug, warn};

use crate::mesh::calc_triangle_normals;
use crate::util::{Color, Point3, UnitVector3};

use super::{Link, NodeId, SceneGraph};

/// Vertex positions, millimetres.
#[derive(Clone, Debug, Default)]
pub struct Coords {
    points: Vec<Point3>,
}

impl Coords {
    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn set_points(&mut self, points: Vec<Point3>) {
        self.points = points;
    }

    pub fn add_point(&mut self, p: Point3) {
        self.points.push(p);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-vertex normals.
#[derive(Clone, Debug, Default)]
pub struct Normals {
    vectors: Vec<UnitVector3>,
}

impl Normals {
    #[inline]
    pub fn vectors(&self) -> &[UnitVector3] {
        &self.vectors
    }

    pub fn set_vectors(&mut self, vectors: Vec<UnitVector3>) {
        self.vectors = vectors;
    }

    pub fn add_vector(&mut self, v: UnitVector3) {
        self.vectors.push(v);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Per-vertex colors.
#[derive(Clone, Debug, Default)]
pub struct Colors {
    colors: Vec<Color>,
}

impl Colors {
    #[inline]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn set_colors(&mut self, colors: Vec<Color>) {
        self.colors = colors;
    }

    pub fn add_color(&mut self, c: Color) {
        self.colors.push(c);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Triangle vertex indices, three per face.
#[derive(Clone, Debug, Default)]
pub struct CoordIndex {
    indices: Vec<i32>,
}

impl CoordIndex {
    #[inline]
    pub fn indices(&self) -> &[i32] {
        &self.indices
    }

    pub fn set_indices(&mut self, indices: Vec<i32>) {
        self.indices = indices;
    }

    pub fn add_index(&mut self, i: i32) {
        self.indices.push(i);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl SceneGraph {
    /// Compute per-vertex normals for a coordinate set.
    ///
    /// Triangles are gathered from the face set owning `coords` and from every
    /// face set referencing it, so a shared coordinate set gets a single normal
    /// array. The result is stored in the owner's own normals node (created
    /// if missing). When the owner only references normals held elsewhere,
    /// the caller's own node is used instead. Sharers without normals, or
    /// with an empty owned normals node, then reference the result. `caller`
    /// stands in for the owner when `coords` is parentless.
    pub fn calc_coords_normals(&mut self, coords: NodeId, caller: NodeId) -> Option<NodeId> {
        let points = self.coords(coords)?.points().to_vec();
        let owner = self.parent(coords).unwrap_or(caller);

        let mut sharers = vec![owner];
        for &holder in self.node(coords)?.back_refs() {
            if !sharers.contains(&holder) {
                sharers.push(holder);
            }
        }
        if !sharers.contains(&caller) {
            sharers.push(caller);
        }

        let mut index = Vec::new();
        for &fs in &sharers {
            if let Some(ci) = self.faceset(fs).and_then(|f| f.coord_index()) {
                if let Some(ci) = self.coord_index(ci) {
                    index.extend_from_slice(ci.indices());
                }
            }
        }

        let Some(norms) = calc_triangle_normals(&points, &index) else {
            warn!("normal computation failed for coordinate set");
            return None;
        };

        // a referenced slot belongs to another mesh; never overwrite it
        let target = match self.faceset(owner).and_then(|f| f.normals()) {
            Some(Link::Owned(id)) => id,
            None => self.new_normals(Some(owner)),
            Some(Link::Ref(_)) => match self.faceset(caller).and_then(|f| f.normals()) {
                Some(Link::Owned(id)) => id,
                None => self.new_normals(Some(caller)),
                Some(Link::Ref(_)) => {
                    warn!("no owned normals slot to store computed normals in");
                    return None;
                }
            },
        };
        debug!("computed {} normals from {} triangle indices", norms.len(), index.len());
        self.normals_mut(target)?.set_vectors(norms);
        let target_owner = self.parent(target);

        for &fs in &sharers {
            if Some(fs) == target_owner {
                continue;
            }
            match self.faceset(fs).and_then(|f| f.normals()) {
                None => {}
                // an empty owned array is replaced by the shared one
                Some(Link::Owned(own)) if self.normals(own).is_some_and(|n| n.is_empty()) => {
                    self.delete_node(own);
                }
                Some(_) => continue,
            }
            if !self.add_ref_node(fs, target) {
                warn!("could not share computed normals with a face set");
            }
        }

        Some(target)
    }
}
