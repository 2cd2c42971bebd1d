//! Cache node reader.

use tracing::trace;

use crate::node::{NodeData, NodeId, NodeKind, SceneGraph};
use crate::util::{Error, Result};

use super::stream::IStream;

/// Smallest possible encoding of a node: `[` + one name byte + `]`.
const MIN_NODE_BYTES: usize = 3;

/// Nesting limit for transform chains.
const MAX_DEPTH: usize = 512;

/// Rebuilds a tree from the node section of a cache image.
pub(crate) struct CacheReader<'a> {
    input: IStream<'a>,
    graph: SceneGraph,
    depth: usize,
}

impl<'a> CacheReader<'a> {
    pub(crate) fn new(input: IStream<'a>) -> Self {
        Self { input, graph: SceneGraph::new(), depth: 0 }
    }

    /// Read the root transform and everything below it.
    pub(crate) fn read_root(mut self) -> Result<(SceneGraph, NodeId)> {
        let root = self.read_owned(None, NodeKind::Transform)?;
        if !self.input.is_at_end() {
            trace!("{} trailing bytes after the root node", self.input.remaining());
        }
        Ok((self.graph, root))
    }

    /// Parse a tag and check it names a node of `expected` type.
    fn read_typed_tag(&mut self, expected: NodeKind) -> Result<(String, u64)> {
        let offset = self.input.pos();
        let name = self.input.read_tag()?;
        let Some(kind) = NodeKind::from_name(&name) else {
            return Err(Error::invalid_tag(offset, format!("unknown node type in '{name}'")));
        };
        if kind != expected {
            return Err(Error::TypeMismatch {
                expected: expected.abbrev().to_string(),
                actual: kind.abbrev().to_string(),
                offset,
            });
        }
        Ok((name, offset))
    }

    /// Create a node of `kind` under `parent` and read its payload.
    fn read_owned(&mut self, parent: Option<NodeId>, kind: NodeKind) -> Result<NodeId> {
        let (name, offset) = self.read_typed_tag(kind)?;
        trace!("reading {name} at byte {offset}");

        let id = self.graph.new_node(NodeData::empty(kind), parent);
        if parent.is_some() && self.graph.parent(id) != parent {
            return Err(Error::InvalidData {
                offset,
                msg: format!("{name} could not be attached to its parent"),
            });
        }
        self.graph.set_name(id, &name);

        if self.depth >= MAX_DEPTH {
            return Err(Error::InvalidData { offset, msg: "node nesting too deep".into() });
        }
        self.depth += 1;
        let res = match kind {
            NodeKind::Transform => self.read_transform(id),
            NodeKind::Shape => self.read_shape(id),
            NodeKind::FaceSet => self.read_faceset(id),
            _ => self.read_leaf(id, kind),
        };
        self.depth -= 1;
        res.map(|()| id)
    }

    /// Resolve a bare tag against nodes read so far and link it from `holder`.
    fn read_ref(&mut self, holder: NodeId, kind: NodeKind) -> Result<NodeId> {
        let (name, offset) = self.read_typed_tag(kind)?;
        let target = self
            .graph
            .find_node(holder, &name, None)
            .ok_or_else(|| Error::UnresolvedReference { name: name.clone(), offset })?;

        if self.graph.kind(target) != Some(kind) {
            return Err(Error::TypeMismatch {
                expected: kind.abbrev().to_string(),
                actual: self.graph.kind(target).map_or("?", NodeKind::abbrev).to_string(),
                offset,
            });
        }
        if !self.graph.add_ref_node(holder, target) {
            return Err(Error::InvalidData {
                offset,
                msg: format!("reference to {name} rejected"),
            });
        }
        Ok(target)
    }

    /// Read an (owned, referenced) flag pair; both set is corrupt.
    fn read_flag_pair(&mut self) -> Result<(bool, bool)> {
        let offset = self.input.pos();
        let owned = self.input.read_bool()?;
        let referenced = self.input.read_bool()?;
        if owned && referenced {
            return Err(Error::InvalidData {
                offset,
                msg: "slot flagged both owned and referenced".into(),
            });
        }
        Ok((owned, referenced))
    }

    fn read_slot(&mut self, holder: NodeId, kind: NodeKind, flags: (bool, bool)) -> Result<()> {
        match flags {
            (true, _) => self.read_owned(Some(holder), kind).map(drop),
            (_, true) => self.read_ref(holder, kind).map(drop),
            _ => Ok(()),
        }
    }

    fn read_transform(&mut self, id: NodeId) -> Result<()> {
        let center = self.input.read_point()?;
        let translation = self.input.read_point()?;
        let rotation_axis = self.input.read_unit_vector()?;
        let rotation_angle = self.input.read_f64()?;
        let scale = self.input.read_point()?;
        let scale_axis = self.input.read_unit_vector()?;
        let scale_angle = self.input.read_f64()?;

        if let Some(t) = self.graph.transform_mut(id) {
            t.set_center(center);
            t.set_translation(translation);
            t.set_rotation(rotation_axis, rotation_angle);
            t.set_scale(scale);
            t.set_scale_orientation(scale_axis, scale_angle);
        }

        let n_transforms = self.input.read_count(MIN_NODE_BYTES)?;
        let n_ref_transforms = self.input.read_count(MIN_NODE_BYTES)?;
        let n_shapes = self.input.read_count(MIN_NODE_BYTES)?;
        let n_ref_shapes = self.input.read_count(MIN_NODE_BYTES)?;

        for _ in 0..n_transforms {
            self.read_owned(Some(id), NodeKind::Transform)?;
        }
        for _ in 0..n_ref_transforms {
            self.read_ref(id, NodeKind::Transform)?;
        }
        for _ in 0..n_shapes {
            self.read_owned(Some(id), NodeKind::Shape)?;
        }
        for _ in 0..n_ref_shapes {
            self.read_ref(id, NodeKind::Shape)?;
        }
        Ok(())
    }

    fn read_shape(&mut self, id: NodeId) -> Result<()> {
        let appearance = self.read_flag_pair()?;
        let faceset = self.read_flag_pair()?;
        self.read_slot(id, NodeKind::Appearance, appearance)?;
        self.read_slot(id, NodeKind::FaceSet, faceset)
    }

    fn read_faceset(&mut self, id: NodeId) -> Result<()> {
        let coords = self.read_flag_pair()?;
        let index = self.input.read_bool()?;
        let normals = self.read_flag_pair()?;
        let colors = self.read_flag_pair()?;

        self.read_slot(id, NodeKind::Coords, coords)?;
        self.read_slot(id, NodeKind::CoordIndex, (index, false))?;
        self.read_slot(id, NodeKind::Normals, normals)?;
        self.read_slot(id, NodeKind::Colors, colors)
    }

    fn read_leaf(&mut self, id: NodeId, kind: NodeKind) -> Result<()> {
        let input = &mut self.input;
        match kind {
            NodeKind::Appearance => {
                let ambient = input.read_color()?;
                let offset = input.pos();
                let shininess = input.read_f32()?;
                let transparency = input.read_f32()?;
                let diffuse = input.read_color()?;
                let emissive = input.read_color()?;
                let specular = input.read_color()?;

                if let Some(a) = self.graph.appearance_mut(id) {
                    if !a.set_shininess(shininess) || !a.set_transparency(transparency) {
                        return Err(Error::InvalidData {
                            offset,
                            msg: "material fraction outside [0, 1]".into(),
                        });
                    }
                    a.set_ambient(ambient);
                    a.set_diffuse(diffuse);
                    a.set_emissive(emissive);
                    a.set_specular(specular);
                }
            }
            NodeKind::Coords => {
                let n = input.read_count(24)?;
                let points = (0..n).map(|_| input.read_point()).collect::<Result<Vec<_>>>()?;
                if let Some(c) = self.graph.coords_mut(id) {
                    c.set_points(points);
                }
            }
            NodeKind::Normals => {
                let n = input.read_count(24)?;
                let vectors = (0..n).map(|_| input.read_unit_vector()).collect::<Result<Vec<_>>>()?;
                if let Some(v) = self.graph.normals_mut(id) {
                    v.set_vectors(vectors);
                }
            }
            NodeKind::Colors => {
                let n = input.read_count(12)?;
                let colors = (0..n).map(|_| input.read_color()).collect::<Result<Vec<_>>>()?;
                if let Some(c) = self.graph.colors_mut(id) {
                    c.set_colors(colors);
                }
            }
            NodeKind::CoordIndex => {
                let n = input.read_count(4)?;
                let indices = (0..n).map(|_| input.read_i32()).collect::<Result<Vec<_>>>()?;
                if let Some(i) = self.graph.coord_index_mut(id) {
                    i.set_indices(indices);
                }
            }
            NodeKind::Transform | NodeKind::Shape | NodeKind::FaceSet => {
                return Err(Error::other("grouping node passed to leaf reader"));
            }
        }
        Ok(())
    }
}
