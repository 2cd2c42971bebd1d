//! Face set node: an indexed triangle mesh assembled from leaf data nodes.

use std::cell::Cell;

use tracing::warn;

use super::{clear_slot, fill_slot, Attach, Link, NodeId, NodeKind, SceneGraph, Slots};

/// Triangle mesh. Coordinates, normals and colors may be owned or referenced;
/// the index list is always owned.
#[derive(Clone, Debug, Default)]
pub struct FaceSet {
    coords: Option<Link>,
    coord_index: Option<NodeId>,
    normals: Option<Link>,
    colors: Option<Link>,
    /// Memoized result of [`SceneGraph::validate`]; cleared on slot changes.
    validity: Cell<Option<bool>>,
}

impl FaceSet {
    #[inline]
    pub fn coords(&self) -> Option<Link> {
        self.coords
    }

    #[inline]
    pub fn coord_index(&self) -> Option<NodeId> {
        self.coord_index
    }

    #[inline]
    pub fn normals(&self) -> Option<Link> {
        self.normals
    }

    #[inline]
    pub fn colors(&self) -> Option<Link> {
        self.colors
    }

    /// Cached validation result, if computed since the last slot change.
    #[inline]
    pub fn cached_validity(&self) -> Option<bool> {
        self.validity.get()
    }

    pub(crate) fn invalidate(&self) {
        self.validity.set(None);
    }
}

impl Slots for FaceSet {
    fn attach(&mut self, kind: NodeKind, link: Link) -> Attach {
        match kind {
            NodeKind::Coords => fill_slot(&mut self.coords, link),
            NodeKind::Normals => fill_slot(&mut self.normals, link),
            NodeKind::Colors => fill_slot(&mut self.colors, link),
            NodeKind::CoordIndex => match (link, self.coord_index) {
                (Link::Ref(_), _) => Attach::Unsupported,
                (Link::Owned(id), None) => {
                    self.coord_index = Some(id);
                    Attach::Added
                }
                (Link::Owned(id), Some(cur)) if cur == id => Attach::Present,
                (Link::Owned(_), Some(_)) => Attach::Occupied,
            },
            _ => Attach::Unsupported,
        }
    }

    fn detach(&mut self, id: NodeId, owned: bool) -> bool {
        if owned && self.coord_index == Some(id) {
            self.coord_index = None;
            return true;
        }
        clear_slot(&mut self.coords, id, owned)
            || clear_slot(&mut self.normals, id, owned)
            || clear_slot(&mut self.colors, id, owned)
    }

    fn owned_children(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(4);
        if let Some(Link::Owned(id)) = self.coords {
            out.push(id);
        }
        out.extend(self.coord_index);
        for link in [self.normals, self.colors].into_iter().flatten() {
            if link.is_owned() {
                out.push(link.id());
            }
        }
        out
    }

    fn references(&self) -> Vec<NodeId> {
        [self.coords, self.normals, self.colors]
            .into_iter()
            .flatten()
            .filter(|l| !l.is_owned())
            .map(Link::id)
            .collect()
    }
}

impl SceneGraph {
    /// Check that a face set can be rendered.
    ///
    /// Requires coordinates (at least 3), an index list whose length is a
    /// non-zero multiple of 3 with every entry in range, one normal per
    /// coordinate, and at least one color per coordinate when colors are
    /// present. The result is computed once and cached until the face set's
    /// slots change.
    pub fn validate(&self, faceset: NodeId) -> bool {
        let Some(fs) = self.faceset(faceset) else {
            return false;
        };
        if let Some(valid) = fs.validity.get() {
            return valid;
        }

        let result = self.check_faceset(fs);
        if let Err(reason) = &result {
            warn!("face set failed validation: {reason}");
        }
        let valid = result.is_ok();
        fs.validity.set(Some(valid));
        valid
    }

    fn check_faceset(&self, fs: &FaceSet) -> Result<(), &'static str> {
        let coords = fs
            .coords
            .and_then(|l| self.coords(l.id()))
            .ok_or("no coordinates")?;
        let index = fs
            .coord_index
            .and_then(|id| self.coord_index(id))
            .ok_or("no coordinate index")?;
        let normals = fs
            .normals
            .and_then(|l| self.normals(l.id()))
            .ok_or("no normals")?;

        let n_coords = coords.len();
        if n_coords < 3 {
            return Err("fewer than 3 coordinates");
        }
        let idx = index.indices();
        if idx.len() < 3 || idx.len() % 3 != 0 {
            return Err("index count is not a positive multiple of 3");
        }
        if idx.iter().any(|&i| i < 0 || i as usize >= n_coords) {
            return Err("index out of range");
        }
        if normals.len() != n_coords {
            return Err("normal count does not match coordinate count");
        }
        if let Some(colors) = fs.colors.and_then(|l| self.colors(l.id())) {
            if colors.len() < n_coords {
                return Err("fewer colors than coordinates");
            }
        }
        Ok(())
    }

    /// Make sure the face set has normals, computing them from its
    /// coordinates if needed. Returns the normals node.
    pub fn calc_normals(&mut self, faceset: NodeId) -> Option<NodeId> {
        let fs = self.faceset(faceset)?;
        let coords = fs.coords?.id();
        if self.coords(coords).map_or(true, |c| c.is_empty()) {
            return None;
        }
        if let Some(link) = fs.normals {
            if self.normals(link.id()).is_some_and(|n| !n.is_empty()) {
                return Some(link.id());
            }
        }
        self.calc_coords_normals(coords, faceset)
    }
}
