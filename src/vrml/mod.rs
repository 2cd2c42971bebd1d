//! VRML2.0 export.
//!
//! Coordinates are stored in millimetres; VRML output uses the legacy
//! 0.1 inch unit, so every linear value is divided by [`MM_PER_VRML_UNIT`].
//! With reuse enabled the first visit of a node emits `DEF <name>` and later
//! visits emit `USE <name>`.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::cache::check_target;
use crate::node::{Link, NodeId, SceneGraph};
use crate::util::{DVec3, Error, Result, UnitVector3};

/// File header of every VRML2.0 document.
pub const VRML_HEADER: &str = "#VRML V2.0 utf8\n";

/// Millimetres per VRML length unit.
pub const MM_PER_VRML_UNIT: f64 = 2.54;

/// Options for [`write_vrml`].
#[derive(Clone, Debug)]
pub struct VrmlOptions {
    /// Replace an existing file.
    pub overwrite: bool,
    /// Emit `DEF`/`USE` for nodes reached more than once.
    pub reuse: bool,
    /// Regenerate node names before writing.
    pub rename_nodes: bool,
}

impl Default for VrmlOptions {
    fn default() -> Self {
        Self { overwrite: false, reuse: true, rename_nodes: true }
    }
}

/// Write the tree under transform `node` as a VRML2.0 file.
pub fn write_vrml(
    graph: &mut SceneGraph,
    node: NodeId,
    path: impl AsRef<Path>,
    options: &VrmlOptions,
) -> Result<()> {
    let path = path.as_ref();
    check_target(path, options.overwrite)?;

    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    let res = write_vrml_to(graph, node, &mut out, options).and_then(|()| Ok(out.flush()?));
    drop(out);

    if let Err(e) = res {
        if let Err(rm) = std::fs::remove_file(path) {
            warn!("could not remove partial VRML file {}: {rm}", path.display());
        }
        return Err(e);
    }
    debug!("wrote VRML {}", path.display());
    Ok(())
}

/// Write the tree under transform `node` to `out`.
pub fn write_vrml_to<W: Write>(
    graph: &mut SceneGraph,
    node: NodeId,
    out: &mut W,
    options: &VrmlOptions,
) -> Result<()> {
    let Some(t) = graph.transform(node) else {
        return Err(Error::invalid_node("VRML export must start at a transform"));
    };
    if t.is_empty() {
        return Err(Error::invalid_node("top transform has no children"));
    }

    if options.rename_nodes {
        graph.reset_node_index();
        graph.rename_nodes(node);
    }
    graph.clear_written();

    out.write_all(VRML_HEADER.as_bytes())?;
    let mut emitter = Emitter {
        graph,
        out,
        reuse: options.reuse,
        active: HashSet::new(),
    };
    emitter.transform(node, 0)
}

struct Emitter<'a, W: Write> {
    graph: &'a mut SceneGraph,
    out: &'a mut W,
    reuse: bool,
    /// Transforms on the current path.
    active: HashSet<NodeId>,
}

impl<W: Write> Emitter<'_, W> {
    /// Either writes `USE name` and returns false, or writes the `DEF name`
    /// prefix (when reusing) and returns true.
    fn open(&mut self, id: NodeId, indent: usize, field: &str, vrml_type: &str) -> Result<bool> {
        let pad = pad(indent);
        if !self.reuse {
            writeln!(self.out, "{pad}{field}{vrml_type} {{")?;
            return Ok(true);
        }
        let name = self
            .graph
            .name(id)
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_node("dangling node id in tree"))?;
        if self.graph.is_written(id) {
            writeln!(self.out, "{pad}{field}USE {name}")?;
            return Ok(false);
        }
        self.graph.set_written(id, true);
        writeln!(self.out, "{pad}{field}DEF {name} {vrml_type} {{")?;
        Ok(true)
    }

    fn close(&mut self, indent: usize) -> Result<()> {
        writeln!(self.out, "{}}}", pad(indent))?;
        Ok(())
    }

    fn transform(&mut self, id: NodeId, indent: usize) -> Result<()> {
        let Some(t) = self.graph.transform(id).cloned() else {
            return Ok(());
        };
        if t.is_empty() {
            return Ok(());
        }
        if !self.active.insert(id) {
            warn!("transform reached twice on one path; skipping loop");
            return Ok(());
        }

        if self.open(id, indent, "", "Transform")? {
            let p = pad(indent + 1);
            writeln!(self.out, "{p}center {}", vec3(t.center / MM_PER_VRML_UNIT))?;
            writeln!(self.out, "{p}rotation {}", axis_angle(t.rotation_axis, t.rotation_angle))?;
            writeln!(self.out, "{p}scale {}", vec3(t.scale))?;
            writeln!(self.out, "{p}scaleOrientation {}", axis_angle(t.scale_axis, t.scale_angle))?;
            writeln!(self.out, "{p}translation {}", vec3(t.translation / MM_PER_VRML_UNIT))?;
            writeln!(self.out, "{p}children [")?;
            for &c in t.transforms().iter().chain(t.ref_transforms()) {
                self.transform(c, indent + 2)?;
            }
            for &s in t.shapes().iter().chain(t.ref_shapes()) {
                self.shape(s, indent + 2)?;
            }
            writeln!(self.out, "{p}]")?;
            self.close(indent)?;
        }

        self.active.remove(&id);
        Ok(())
    }

    fn shape(&mut self, id: NodeId, indent: usize) -> Result<()> {
        let Some(s) = self.graph.shape(id) else {
            return Ok(());
        };
        let (appearance, faceset) = (s.appearance(), s.faceset());
        if !self.open(id, indent, "", "Shape")? {
            return Ok(());
        }
        if let Some(link) = appearance {
            self.appearance(link.id(), indent + 1)?;
        }
        if let Some(link) = faceset {
            self.faceset(link.id(), indent + 1)?;
        }
        self.close(indent)
    }

    fn appearance(&mut self, id: NodeId, indent: usize) -> Result<()> {
        let Some(a) = self.graph.appearance(id).cloned() else {
            return Ok(());
        };
        if !self.open(id, indent, "appearance ", "Appearance")? {
            return Ok(());
        }
        let p = pad(indent + 1);
        let q = pad(indent + 2);
        writeln!(self.out, "{p}material Material {{")?;
        writeln!(self.out, "{q}diffuseColor {}", color(a.diffuse.to_array()))?;
        writeln!(self.out, "{q}emissiveColor {}", color(a.emissive.to_array()))?;
        writeln!(self.out, "{q}specularColor {}", color(a.specular.to_array()))?;
        writeln!(self.out, "{q}ambientIntensity {}", num(f64::from(a.ambient_intensity())))?;
        writeln!(self.out, "{q}transparency {}", num(f64::from(a.transparency())))?;
        writeln!(self.out, "{q}shininess {}", num(f64::from(a.shininess())))?;
        writeln!(self.out, "{p}}}")?;
        self.close(indent)
    }

    fn faceset(&mut self, id: NodeId, indent: usize) -> Result<()> {
        let Some(f) = self.graph.faceset(id) else {
            return Ok(());
        };
        let (coords, index, normals, colors) = (f.coords(), f.coord_index(), f.normals(), f.colors());
        if !self.open(id, indent, "geometry ", "IndexedFaceSet")? {
            return Ok(());
        }
        let p = pad(indent + 1);

        if let Some(link) = coords {
            self.coords(link, indent + 1)?;
        }
        if let Some(idx) = index.and_then(|i| self.graph.coord_index(i)) {
            let body = idx
                .indices()
                .chunks(3)
                .map(|tri| {
                    let mut s = tri.iter().map(i32::to_string).collect::<Vec<_>>().join(",");
                    s.push_str(",-1");
                    s
                })
                .collect::<Vec<_>>()
                .join(",\n");
            writeln!(self.out, "{p}coordIndex [\n{body}\n{p}]")?;
        }
        if let Some(link) = normals {
            writeln!(self.out, "{p}normalPerVertex TRUE")?;
            self.normals(link, indent + 1)?;
        }
        if let Some(link) = colors {
            writeln!(self.out, "{p}colorPerVertex TRUE")?;
            self.colors(link, indent + 1)?;
        }
        self.close(indent)
    }

    fn coords(&mut self, link: Link, indent: usize) -> Result<()> {
        let id = link.id();
        let Some(points) = self.graph.coords(id).map(|c| c.points().to_vec()) else {
            return Ok(());
        };
        if self.open(id, indent, "coord ", "Coordinate")? {
            let rows: Vec<String> = points.iter().map(|&v| vec3(v / MM_PER_VRML_UNIT)).collect();
            self.point_list("point", &rows, indent + 1)?;
            self.close(indent)?;
        }
        Ok(())
    }

    fn normals(&mut self, link: Link, indent: usize) -> Result<()> {
        let id = link.id();
        let Some(vectors) = self.graph.normals(id).map(|n| n.vectors().to_vec()) else {
            return Ok(());
        };
        if self.open(id, indent, "normal ", "Normal")? {
            let rows: Vec<String> = vectors.iter().map(|v| vec3(v.get())).collect();
            self.point_list("vector", &rows, indent + 1)?;
            self.close(indent)?;
        }
        Ok(())
    }

    fn colors(&mut self, link: Link, indent: usize) -> Result<()> {
        let id = link.id();
        let Some(colors) = self.graph.colors(id).map(|c| c.colors().to_vec()) else {
            return Ok(());
        };
        if self.open(id, indent, "color ", "Color")? {
            let rows: Vec<String> = colors.iter().map(|c| color(c.to_array())).collect();
            self.point_list("color", &rows, indent + 1)?;
            self.close(indent)?;
        }
        Ok(())
    }

    fn point_list(&mut self, field: &str, rows: &[String], indent: usize) -> Result<()> {
        let p = pad(indent);
        writeln!(self.out, "{p}{field} [\n{}\n{p}]", rows.join(",\n"))?;
        Ok(())
    }
}

fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

/// Shortest decimal with at most 8 fractional digits.
fn num(v: f64) -> String {
    let s = format!("{v:.8}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        _ => s.to_string(),
    }
}

fn vec3(v: DVec3) -> String {
    format!("{} {} {}", num(v.x), num(v.y), num(v.z))
}

fn color(c: [f32; 3]) -> String {
    format!("{} {} {}", num(f64::from(c[0])), num(f64::from(c[1])), num(f64::from(c[2])))
}

fn axis_angle(axis: UnitVector3, angle: f64) -> String {
    format!("{} {}", vec3(axis.get()), num(angle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Point3;

    #[test]
    fn test_num_format() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(-0.0), "0");
        assert_eq!(num(2.5), "2.5");
        assert_eq!(num(1.0 / 3.0), "0.33333333");
    }

    #[test]
    fn test_empty_top_transform_rejected() {
        let mut g = SceneGraph::new();
        let root = g.new_transform(None);
        let mut out = Vec::new();
        assert!(write_vrml_to(&mut g, root, &mut out, &VrmlOptions::default()).is_err());
    }

    #[test]
    fn test_units_and_index() {
        let mut g = SceneGraph::new();
        let root = g.new_transform(None);
        if let Some(t) = g.transform_mut(root) {
            t.set_translation(DVec3::new(2.54, 0.0, 0.0));
        }
        g.new_transform(Some(root));
        let shape = g.new_shape(Some(root));
        let face = g.new_faceset(Some(shape));
        let coords = g.new_coords(Some(face));
        if let Some(c) = g.coords_mut(coords) {
            c.set_points(vec![Point3::ZERO, Point3::new(25.4, 0.0, 0.0), Point3::Y]);
        }
        let idx = g.new_coord_index(Some(face));
        if let Some(i) = g.coord_index_mut(idx) {
            i.set_indices(vec![0, 1, 2]);
        }

        let mut out = Vec::new();
        write_vrml_to(&mut g, root, &mut out, &VrmlOptions::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(VRML_HEADER));
        assert!(text.contains("translation 1 0 0"));
        assert!(text.contains("10 0 0"));
        assert!(text.contains("0,1,2,-1"));
        // nested empty transform is skipped
        assert_eq!(text.matches("Transform {").count(), 1);
        assert!(text.contains("DEF TXFM_1 Transform"));
    }
}
