//! Cache node writer.

use std::io::Write;

use tracing::trace;

use crate::node::{Link, NodeData, NodeId, NodeKind, SceneGraph};
use crate::util::{Error, Result};

use super::stream::OStream;

/// Serializes an already canonicalized, freshly named tree.
pub(crate) struct CacheWriter<'a, W: Write> {
    graph: &'a mut SceneGraph,
    out: &'a mut OStream<W>,
}

impl<'a, W: Write> CacheWriter<'a, W> {
    pub(crate) fn new(graph: &'a mut SceneGraph, out: &'a mut OStream<W>) -> Self {
        Self { graph, out }
    }

    fn tag_name(&mut self, id: NodeId) -> Result<String> {
        self.graph
            .name(id)
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_node("dangling node id in tree"))
    }

    /// Write `id` with its full payload.
    pub(crate) fn write_node(&mut self, id: NodeId) -> Result<()> {
        let name = self.tag_name(id)?;
        if self.graph.is_written(id) {
            return Err(Error::WriteFailed(format!("node {name} written twice")));
        }
        trace!("writing {name} at byte {}", self.out.pos());
        self.out.write_tag(&name)?;
        self.graph.set_written(id, true);

        let data = self.graph.node(id).map(|n| n.data());
        match data {
            Some(NodeData::Transform(t)) => {
                let t = t.clone();
                self.out.write_point(t.center)?;
                self.out.write_point(t.translation)?;
                self.out.write_unit_vector(t.rotation_axis)?;
                self.out.write_f64(t.rotation_angle)?;
                self.out.write_point(t.scale)?;
                self.out.write_unit_vector(t.scale_axis)?;
                self.out.write_f64(t.scale_angle)?;

                self.out.write_count(t.transforms().len())?;
                self.out.write_count(t.ref_transforms().len())?;
                self.out.write_count(t.shapes().len())?;
                self.out.write_count(t.ref_shapes().len())?;

                for &c in t.transforms() {
                    self.write_node(c)?;
                }
                for &r in t.ref_transforms() {
                    self.write_ref(r)?;
                }
                for &c in t.shapes() {
                    self.write_node(c)?;
                }
                for &r in t.ref_shapes() {
                    self.write_ref(r)?;
                }
            }
            Some(NodeData::Shape(s)) => {
                let slots = [s.appearance(), s.faceset()];
                for link in slots {
                    self.out.write_bool(matches!(link, Some(Link::Owned(_))))?;
                    self.out.write_bool(matches!(link, Some(Link::Ref(_))))?;
                }
                for link in slots.into_iter().flatten() {
                    self.write_link(link)?;
                }
            }
            Some(NodeData::FaceSet(f)) => {
                let (coords, index) = (f.coords(), f.coord_index());
                let rest = [f.normals(), f.colors()];

                self.out.write_bool(matches!(coords, Some(Link::Owned(_))))?;
                self.out.write_bool(matches!(coords, Some(Link::Ref(_))))?;
                self.out.write_bool(index.is_some())?;
                for link in rest {
                    self.out.write_bool(matches!(link, Some(Link::Owned(_))))?;
                    self.out.write_bool(matches!(link, Some(Link::Ref(_))))?;
                }

                if let Some(link) = coords {
                    self.write_link(link)?;
                }
                if let Some(idx) = index {
                    self.write_node(idx)?;
                }
                for link in rest.into_iter().flatten() {
                    self.write_link(link)?;
                }
            }
            Some(leaf) => write_leaf(self.out, leaf)?,
            None => return Err(Error::invalid_node(name)),
        }
        Ok(())
    }

    fn write_link(&mut self, link: Link) -> Result<()> {
        match link {
            Link::Owned(id) => self.write_node(id),
            Link::Ref(id) => self.write_ref(id),
        }
    }

    /// Bare `[name]` tag for a node written earlier in the stream.
    fn write_ref(&mut self, id: NodeId) -> Result<()> {
        let name = self.tag_name(id)?;
        if !self.graph.is_written(id) {
            let kind = self.graph.kind(id).map_or("?", NodeKind::abbrev);
            return Err(Error::WriteFailed(format!(
                "reference to {kind} node {name} precedes its payload"
            )));
        }
        self.out.write_tag(&name)
    }
}

/// Payload of a node without children.
fn write_leaf<W: Write>(out: &mut OStream<W>, data: &NodeData) -> Result<()> {
    match data {
        NodeData::Appearance(a) => {
            out.write_color(a.ambient)?;
            out.write_f32(a.shininess())?;
            out.write_f32(a.transparency())?;
            out.write_color(a.diffuse)?;
            out.write_color(a.emissive)?;
            out.write_color(a.specular)?;
        }
        NodeData::Coords(c) => {
            out.write_count(c.len())?;
            for &p in c.points() {
                out.write_point(p)?;
            }
        }
        NodeData::Normals(n) => {
            out.write_count(n.len())?;
            for &v in n.vectors() {
                out.write_unit_vector(v)?;
            }
        }
        NodeData::Colors(c) => {
            out.write_count(c.len())?;
            for &col in c.colors() {
                out.write_color(col)?;
            }
        }
        NodeData::CoordIndex(ci) => {
            out.write_count(ci.len())?;
            for &i in ci.indices() {
                out.write_i32(i)?;
            }
        }
        NodeData::Transform(_) | NodeData::Shape(_) | NodeData::FaceSet(_) => {
            return Err(Error::other("grouping node passed to leaf writer"));
        }
    }
    Ok(())
}
