//! Scene-graph nodes and the ownership/reference protocol.
//!
//! All nodes live in a [`SceneGraph`] arena and are addressed by [`NodeId`].
//! Two kinds of edge connect them:
//!
//! - **ownership**: tree-shaped. Every node has at most one parent, and each
//!   node type accepts exactly one parent type (see [`NodeKind::parent_kind`]).
//!   Deleting a node deletes its owned subtree.
//! - **reference**: a non-owning link layered on top of the tree. The target
//!   records the holder in its back-reference list so that deleting the target
//!   clears the holder's slot.
//!
//! Structural misuse (wrong parent type, filled slot, dangling id) is reported
//! through a `false`/`None` return and a `tracing` warning. Nothing here panics
//! on bad input.

mod appearance;
mod faceset;
mod geometry;
mod handle;
mod naming;
mod shape;
mod transform;

pub use appearance::Appearance;
pub use faceset::FaceSet;
pub use geometry::{Colors, CoordIndex, Coords, Normals};
pub use handle::NodeHandle;
pub use naming::NamingContext;
pub use shape::Shape;
pub use transform::Transform;

use std::collections::HashSet;
use std::fmt;

use slotmap::SlotMap;
use smallvec::SmallVec;
use tracing::{trace, warn};

slotmap::new_key_type! {
    /// Stable identifier of a node inside a [`SceneGraph`].
    pub struct NodeId;
}

/// Node type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Transform,
    Appearance,
    Colors,
    FaceSet,
    Coords,
    CoordIndex,
    Normals,
    Shape,
}

impl NodeKind {
    pub const COUNT: usize = 8;

    pub const ALL: [NodeKind; Self::COUNT] = [
        NodeKind::Transform,
        NodeKind::Appearance,
        NodeKind::Colors,
        NodeKind::FaceSet,
        NodeKind::Coords,
        NodeKind::CoordIndex,
        NodeKind::Normals,
        NodeKind::Shape,
    ];

    /// Name prefix used in generated names and cache tags.
    pub fn abbrev(self) -> &'static str {
        match self {
            NodeKind::Transform => "TXFM",
            NodeKind::Appearance => "APP",
            NodeKind::Colors => "COL",
            NodeKind::FaceSet => "FACE",
            NodeKind::Coords => "COORD",
            NodeKind::CoordIndex => "COORDIDX",
            NodeKind::Normals => "NORM",
            NodeKind::Shape => "SHAPE",
        }
    }

    pub fn from_abbrev(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.abbrev() == s)
    }

    /// Recover the type from a generated name such as `COORD_3`.
    pub fn from_name(name: &str) -> Option<Self> {
        let (prefix, _) = name.split_once('_')?;
        Self::from_abbrev(prefix)
    }

    /// The only node type allowed to own a node of this type.
    pub fn parent_kind(self) -> NodeKind {
        match self {
            NodeKind::Transform | NodeKind::Shape => NodeKind::Transform,
            NodeKind::Appearance | NodeKind::FaceSet => NodeKind::Shape,
            NodeKind::Colors | NodeKind::Coords | NodeKind::CoordIndex | NodeKind::Normals => {
                NodeKind::FaceSet
            }
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// Content of a single-valued slot: an owned child or a referenced node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Link {
    Owned(NodeId),
    Ref(NodeId),
}

impl Link {
    #[inline]
    pub fn id(self) -> NodeId {
        match self {
            Link::Owned(id) | Link::Ref(id) => id,
        }
    }

    #[inline]
    pub fn is_owned(self) -> bool {
        matches!(self, Link::Owned(_))
    }
}

/// Outcome of placing a node into a holder's slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Attach {
    Added,
    Present,
    Occupied,
    Unsupported,
}

/// Fill a single-valued slot. The same node is accepted whether it sits there
/// as owned or referenced.
pub(crate) fn fill_slot(slot: &mut Option<Link>, link: Link) -> Attach {
    match *slot {
        None => {
            *slot = Some(link);
            Attach::Added
        }
        Some(cur) if cur.id() == link.id() => Attach::Present,
        Some(_) => Attach::Occupied,
    }
}

/// Remove `id` from a single-valued slot if it is held with the given ownership.
pub(crate) fn clear_slot(slot: &mut Option<Link>, id: NodeId, owned: bool) -> bool {
    match *slot {
        Some(cur) if cur.id() == id && cur.is_owned() == owned => {
            *slot = None;
            true
        }
        _ => false,
    }
}

/// Child bookkeeping for node types that hold other nodes.
pub(crate) trait Slots {
    fn attach(&mut self, kind: NodeKind, link: Link) -> Attach;

    fn detach(&mut self, id: NodeId, owned: bool) -> bool;

    /// Owned children in write order.
    fn owned_children(&self) -> Vec<NodeId>;

    /// Referenced nodes in write order.
    fn references(&self) -> Vec<NodeId>;
}

/// Type-specific payload of a node.
#[derive(Clone, Debug)]
pub enum NodeData {
    Transform(Transform),
    Appearance(Appearance),
    Colors(Colors),
    FaceSet(FaceSet),
    Coords(Coords),
    CoordIndex(CoordIndex),
    Normals(Normals),
    Shape(Shape),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Transform(_) => NodeKind::Transform,
            NodeData::Appearance(_) => NodeKind::Appearance,
            NodeData::Colors(_) => NodeKind::Colors,
            NodeData::FaceSet(_) => NodeKind::FaceSet,
            NodeData::Coords(_) => NodeKind::Coords,
            NodeData::CoordIndex(_) => NodeKind::CoordIndex,
            NodeData::Normals(_) => NodeKind::Normals,
            NodeData::Shape(_) => NodeKind::Shape,
        }
    }

    /// Empty payload for a node type.
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Transform => NodeData::Transform(Transform::default()),
            NodeKind::Appearance => NodeData::Appearance(Appearance::default()),
            NodeKind::Colors => NodeData::Colors(Colors::default()),
            NodeKind::FaceSet => NodeData::FaceSet(FaceSet::default()),
            NodeKind::Coords => NodeData::Coords(Coords::default()),
            NodeKind::CoordIndex => NodeData::CoordIndex(CoordIndex::default()),
            NodeKind::Normals => NodeData::Normals(Normals::default()),
            NodeKind::Shape => NodeData::Shape(Shape::default()),
        }
    }

    fn slots(&self) -> Option<&dyn Slots> {
        match self {
            NodeData::Transform(t) => Some(t),
            NodeData::Shape(s) => Some(s),
            NodeData::FaceSet(f) => Some(f),
            _ => None,
        }
    }

    fn slots_mut(&mut self) -> Option<&mut dyn Slots> {
        match self {
            NodeData::Transform(t) => Some(t),
            NodeData::Shape(s) => Some(s),
            NodeData::FaceSet(f) => Some(f),
            _ => None,
        }
    }
}

/// A node in the arena: payload plus identity and link bookkeeping.
#[derive(Debug)]
pub struct Node {
    data: NodeData,
    name: Option<String>,
    parent: Option<NodeId>,
    back_refs: SmallVec<[NodeId; 4]>,
    handle: Option<NodeHandle>,
    written: bool,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            name: None,
            parent: None,
            back_refs: SmallVec::new(),
            handle: None,
            written: false,
        }
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    #[inline]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Assigned name, if any. See [`SceneGraph::name`] for lazy assignment.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Nodes holding a non-owning reference to this one.
    #[inline]
    pub fn back_refs(&self) -> &[NodeId] {
        &self.back_refs
    }

    #[inline]
    pub fn is_written(&self) -> bool {
        self.written
    }
}

macro_rules! payload_accessors {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty) => {
        pub fn $get(&self, id: NodeId) -> Option<&$ty> {
            match self.nodes.get(id).map(|n| &n.data) {
                Some(NodeData::$variant(v)) => Some(v),
                _ => None,
            }
        }

        pub fn $get_mut(&mut self, id: NodeId) -> Option<&mut $ty> {
            match self.nodes.get_mut(id).map(|n| &mut n.data) {
                Some(NodeData::$variant(v)) => Some(v),
                _ => None,
            }
        }
    };
}

/// Arena owning every node of one or more model trees.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    naming: NamingContext,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// The node's type tag.
    #[inline]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(id).map(Node::kind)
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Topmost ancestor of `id` (itself when parentless).
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = id;
        self.nodes.get(cur)?;
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        Some(cur)
    }

    /// Owned children of `id` in write order.
    pub fn owned_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .and_then(|n| n.data.slots())
            .map(|s| s.owned_children())
            .unwrap_or_default()
    }

    /// Nodes referenced (not owned) by `id` in write order.
    pub fn references(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .and_then(|n| n.data.slots())
            .map(|s| s.references())
            .unwrap_or_default()
    }

    /// True if `ancestor` is `id` or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    payload_accessors!(transform, transform_mut, Transform, Transform);
    payload_accessors!(appearance, appearance_mut, Appearance, Appearance);
    payload_accessors!(colors, colors_mut, Colors, Colors);
    payload_accessors!(coords, coords_mut, Coords, Coords);
    payload_accessors!(coord_index, coord_index_mut, CoordIndex, CoordIndex);
    payload_accessors!(normals, normals_mut, Normals, Normals);

    pub fn shape(&self, id: NodeId) -> Option<&Shape> {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Shape(s)) => Some(s),
            _ => None,
        }
    }

    pub fn faceset(&self, id: NodeId) -> Option<&FaceSet> {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::FaceSet(f)) => Some(f),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Insert a node and, if `parent` has the accepted parent type, link it
    /// as an owned child. An incompatible parent leaves the node parentless.
    pub fn new_node(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let kind = data.kind();
        let id = self.nodes.insert(Node::new(data));

        if let Some(p) = parent {
            match self.kind(p) {
                Some(pk) if pk == kind.parent_kind() => {
                    if !self.add_child_node(p, id) {
                        warn!("new {kind} node could not be linked to its parent");
                    }
                }
                Some(pk) => {
                    warn!(
                        "{kind} node requires a {} parent, got {pk}; node left without parent",
                        kind.parent_kind()
                    );
                }
                None => warn!("{kind} node created with a dangling parent id"),
            }
        }

        id
    }

    pub fn new_transform(&mut self, parent: Option<NodeId>) -> NodeId {
        self.new_node(NodeData::Transform(Transform::default()), parent)
    }

    pub fn new_shape(&mut self, parent: Option<NodeId>) -> NodeId {
        self.new_node(NodeData::Shape(Shape::default()), parent)
    }

    pub fn new_appearance(&mut self, parent: Option<NodeId>) -> NodeId {
        self.new_node(NodeData::Appearance(Appearance::default()), parent)
    }

    pub fn new_faceset(&mut self, parent: Option<NodeId>) -> NodeId {
        self.new_node(NodeData::FaceSet(FaceSet::default()), parent)
    }

    pub fn new_coords(&mut self, parent: Option<NodeId>) -> NodeId {
        self.new_node(NodeData::Coords(Coords::default()), parent)
    }

    pub fn new_coord_index(&mut self, parent: Option<NodeId>) -> NodeId {
        self.new_node(NodeData::CoordIndex(CoordIndex::default()), parent)
    }

    pub fn new_normals(&mut self, parent: Option<NodeId>) -> NodeId {
        self.new_node(NodeData::Normals(Normals::default()), parent)
    }

    pub fn new_colors(&mut self, parent: Option<NodeId>) -> NodeId {
        self.new_node(NodeData::Colors(Colors::default()), parent)
    }

    // ------------------------------------------------------------------
    // Ownership and references
    // ------------------------------------------------------------------

    /// Move `id` under `new_parent` (or detach it with `None`).
    ///
    /// With `notify` the old parent drops its child entry; pass `false` only
    /// when the old parent has already done so. Fails without side effects if
    /// `new_parent` is not the accepted parent type.
    pub fn set_parent(&mut self, id: NodeId, new_parent: Option<NodeId>, notify: bool) -> bool {
        let Some(node) = self.nodes.get(id) else {
            warn!("set_parent on a dangling node id");
            return false;
        };
        let kind = node.kind();
        let old = node.parent;

        if old == new_parent {
            return true;
        }

        if let Some(np) = new_parent {
            match self.kind(np) {
                Some(pk) if pk == kind.parent_kind() => {}
                Some(pk) => {
                    warn!("{kind} node cannot be parented to a {pk} node");
                    return false;
                }
                None => {
                    warn!("set_parent with a dangling parent id");
                    return false;
                }
            }
            if self.is_ancestor_or_self(id, np) {
                warn!("set_parent would create an ownership cycle");
                return false;
            }
        }

        if let Some(op) = old {
            if notify {
                self.unlink_child_node(op, id);
            }
            self.nodes[id].parent = None;
        }

        match new_parent {
            None => true,
            Some(np) => self.add_child_node(np, id),
        }
    }

    /// Make `child` an owned child of `parent`.
    ///
    /// Returns true if the slot now holds `child` (including when it already
    /// did). Fails if the slot holds a different node, if `child` has another
    /// parent, or if `parent` has no slot for the child's type.
    pub fn add_child_node(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child {
            warn!("a node cannot own itself");
            return false;
        }
        let (Some(pk), Some(ck)) = (self.kind(parent), self.kind(child)) else {
            warn!("add_child_node with a dangling node id");
            return false;
        };

        match self.nodes[child].parent {
            Some(p) if p != parent => {
                warn!("{ck} node added as child already has a different parent");
                return false;
            }
            Some(_) => {}
            None => {
                if self.is_ancestor_or_self(child, parent) {
                    warn!("add_child_node would create an ownership cycle");
                    return false;
                }
                // promote an existing reference of the same node to ownership
                if self.references(parent).contains(&child) {
                    self.unlink_ref_node(parent, child);
                }
            }
        }

        let outcome = match self.nodes[parent].data.slots_mut() {
            Some(slots) => slots.attach(ck, Link::Owned(child)),
            None => Attach::Unsupported,
        };

        match outcome {
            Attach::Added => {
                self.nodes[child].parent = Some(parent);
                self.touch(parent);
                true
            }
            Attach::Present => true,
            Attach::Occupied => {
                warn!("{pk} node already holds a different {ck} node");
                false
            }
            Attach::Unsupported => {
                warn!("{pk} node cannot own a {ck} node");
                false
            }
        }
    }

    /// Record a non-owning reference from `holder` to `target`.
    pub fn add_ref_node(&mut self, holder: NodeId, target: NodeId) -> bool {
        if holder == target {
            warn!("a node cannot reference itself");
            return false;
        }
        let (Some(hk), Some(tk)) = (self.kind(holder), self.kind(target)) else {
            warn!("add_ref_node with a dangling node id");
            return false;
        };
        if self.is_ancestor_or_self(target, holder) {
            warn!("{hk} node cannot reference its own ancestor");
            return false;
        }

        let outcome = match self.nodes[holder].data.slots_mut() {
            Some(slots) => slots.attach(tk, Link::Ref(target)),
            None => Attach::Unsupported,
        };

        match outcome {
            Attach::Added => {
                self.add_node_ref(target, holder);
                self.touch(holder);
                true
            }
            Attach::Present => true,
            Attach::Occupied => {
                warn!("{hk} node already holds a different {tk} node");
                false
            }
            Attach::Unsupported => {
                warn!("{hk} node cannot reference a {tk} node");
                false
            }
        }
    }

    /// Remove `child` from `parent`'s owned slots. The child keeps existing.
    pub(crate) fn unlink_child_node(&mut self, parent: NodeId, child: NodeId) -> bool {
        let removed = self
            .nodes
            .get_mut(parent)
            .and_then(|n| n.data.slots_mut())
            .map(|s| s.detach(child, true))
            .unwrap_or(false);
        if removed {
            self.touch(parent);
        }
        removed
    }

    /// Remove `target` from `holder`'s referenced slots and drop the matching
    /// back-reference.
    pub(crate) fn unlink_ref_node(&mut self, holder: NodeId, target: NodeId) -> bool {
        let removed = self
            .nodes
            .get_mut(holder)
            .and_then(|n| n.data.slots_mut())
            .map(|s| s.detach(target, false))
            .unwrap_or(false);
        if removed {
            self.del_node_ref(target, holder);
            self.touch(holder);
        }
        removed
    }

    /// Register `holder` as referencing `id`. Duplicate adds are ignored.
    pub(crate) fn add_node_ref(&mut self, id: NodeId, holder: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            if !node.back_refs.contains(&holder) {
                node.back_refs.push(holder);
            }
        }
    }

    /// Forget `holder` as a referencer of `id`.
    pub(crate) fn del_node_ref(&mut self, id: NodeId, holder: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        match node.back_refs.iter().position(|&h| h == holder) {
            Some(pos) => {
                node.back_refs.remove(pos);
            }
            None => trace!("del_node_ref: holder is not a back-reference of this node"),
        }
    }

    /// Promote `id` from a reference into an owned child of `new_parent`,
    /// leaving a reference at the old parent.
    ///
    /// `new_parent` must have the same type as the current parent. A
    /// parentless node is simply attached as a child. The move is refused
    /// when a node in the moved subtree references `new_parent` or one of
    /// its ancestors.
    pub fn swap_parent(&mut self, id: NodeId, new_parent: NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            warn!("swap_parent on a dangling node id");
            return false;
        };
        let kind = node.kind();
        let old = node.parent;

        if old == Some(new_parent) {
            return true;
        }
        if !self.contains(new_parent) {
            warn!("swap_parent with a dangling parent id");
            return false;
        }

        if self.subtree_refs_ancestor_of(id, new_parent) {
            warn!("swap_parent would leave a reference to an ancestor inside the moved {kind} subtree");
            return false;
        }

        let Some(op) = old else {
            return self.add_child_node(new_parent, id);
        };

        if self.kind(op) != self.kind(new_parent) {
            warn!("swap_parent: new parent type differs from the current parent of this {kind} node");
            return false;
        }
        if self.is_ancestor_or_self(id, new_parent) {
            warn!("swap_parent would create an ownership cycle");
            return false;
        }

        self.unlink_child_node(op, id);
        self.nodes[id].parent = None;
        self.unlink_ref_node(new_parent, id);

        if !self.add_child_node(new_parent, id) {
            // put things back the way they were
            self.add_child_node(op, id);
            return false;
        }
        self.add_ref_node(op, id);
        trace!("swap_parent: {kind} node promoted to owned child");
        true
    }

    /// True if any node owned under `id` (or `id` itself) references `node`
    /// or one of its ancestors.
    fn subtree_refs_ancestor_of(&self, id: NodeId, node: NodeId) -> bool {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if self
                .references(cur)
                .into_iter()
                .any(|r| self.is_ancestor_or_self(r, node))
            {
                return true;
            }
            stack.extend(self.owned_children(cur));
        }
        false
    }

    /// Depth-first name lookup over owned and referenced nodes, widening to
    /// the parent chain when the local subtree has no match. The subtree of
    /// `caller` is never searched.
    pub fn find_node(&self, start: NodeId, name: &str, caller: Option<NodeId>) -> Option<NodeId> {
        if name.is_empty() || !self.contains(start) {
            return None;
        }

        let mut visited = HashSet::new();
        if let Some(c) = caller {
            visited.insert(c);
        }

        let mut cur = Some(start);
        while let Some(c) = cur {
            if let Some(hit) = self.search_down(c, name, &mut visited) {
                return Some(hit);
            }
            cur = self.parent(c);
        }
        None
    }

    fn search_down(&self, id: NodeId, name: &str, visited: &mut HashSet<NodeId>) -> Option<NodeId> {
        if !visited.insert(id) {
            return None;
        }
        let node = self.nodes.get(id)?;
        if node.name.as_deref() == Some(name) {
            return Some(id);
        }
        let Some(slots) = node.data.slots() else {
            return None;
        };
        slots
            .owned_children()
            .into_iter()
            .chain(slots.references())
            .find_map(|c| self.search_down(c, name, visited))
    }

    /// Delete `id` and its owned subtree.
    ///
    /// The node is unlinked from its parent, every holder of a reference to a
    /// deleted node loses that reference, and associated handles are cleared.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if let Some(p) = self.parent(id) {
            self.unlink_child_node(p, id);
            self.nodes[id].parent = None;
        }
        self.destroy(id);
        true
    }

    fn destroy(&mut self, id: NodeId) {
        for target in self.references(id) {
            self.del_node_ref(target, id);
        }
        for child in self.owned_children(id) {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = None;
            }
            self.destroy(child);
        }

        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        for holder in node.back_refs {
            let detached = self
                .nodes
                .get_mut(holder)
                .and_then(|n| n.data.slots_mut())
                .map(|s| s.detach(id, false))
                .unwrap_or(false);
            if detached {
                self.touch(holder);
            }
        }
        if let Some(handle) = node.handle {
            handle.set(None);
        }
    }

    /// Invalidate cached state of `holder` after its slots changed.
    fn touch(&mut self, holder: NodeId) {
        if let Some(NodeData::FaceSet(f)) = self.nodes.get(holder).map(|n| &n.data) {
            f.invalidate();
        }
    }

    // ------------------------------------------------------------------
    // External handles
    // ------------------------------------------------------------------

    /// Associate an external handle with `id`. A previously associated,
    /// different handle is cleared and replaced.
    pub fn associate_wrapper(&mut self, id: NodeId, handle: &NodeHandle) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            warn!("associate_wrapper on a dangling node id");
            return false;
        };
        if let Some(old) = node.handle.take() {
            if !old.same(handle) {
                warn!("node already has an associated handle; replacing it");
                old.set(None);
            }
        }
        handle.set(Some(id));
        node.handle = Some(handle.clone());
        true
    }

    /// Drop the association with `handle` if it is the one registered.
    pub fn disassociate_wrapper(&mut self, id: NodeId, handle: &NodeHandle) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        match &node.handle {
            Some(h) if h.same(handle) => {
                node.handle = None;
                true
            }
            Some(_) => {
                warn!("disassociate_wrapper: handle does not match the associated one");
                false
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------

    /// Restart every per-type name counter at 1.
    pub fn reset_node_index(&mut self) {
        self.naming.reset();
    }

    /// Name of `id`, generating a unique one if none is set.
    pub fn name(&mut self, id: NodeId) -> Option<&str> {
        let kind = self.kind(id)?;
        if self.nodes[id].name.is_none() {
            let generated = self.naming.next_name(kind);
            self.nodes[id].name = Some(generated);
        }
        self.nodes[id].name.as_deref()
    }

    /// Set a name; an empty name requests a generated one.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> bool {
        let Some(kind) = self.kind(id) else {
            return false;
        };
        let name = if name.is_empty() {
            self.naming.next_name(kind)
        } else {
            name.to_string()
        };
        self.nodes[id].name = Some(name);
        true
    }

    /// Regenerate names for `id` and its owned subtree, and clear their
    /// written flags. Referenced nodes are not visited.
    pub fn rename_nodes(&mut self, id: NodeId) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        let generated = self.naming.next_name(kind);
        let node = &mut self.nodes[id];
        node.name = Some(generated);
        node.written = false;

        for child in self.owned_children(id) {
            self.rename_nodes(child);
        }
    }

    // ------------------------------------------------------------------
    // Written flags
    // ------------------------------------------------------------------

    #[inline]
    pub fn is_written(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.written)
    }

    pub(crate) fn set_written(&mut self, id: NodeId, written: bool) {
        if let Some(n) = self.nodes.get_mut(id) {
            n.written = written;
        }
    }

    /// Clear the written flag on every node of the arena.
    pub fn clear_written(&mut self) {
        for node in self.nodes.values_mut() {
            node.written = false;
        }
    }
}
