//! External handles onto scene-graph nodes.

use std::cell::Cell;
use std::rc::Rc;

use super::NodeId;

/// A weak, shareable handle that observes a single node.
///
/// The graph holds a clone of the handle it is associated with and clears it
/// when the node is deleted or when another handle replaces it. Holders check
/// [`NodeHandle::get`] before use.
#[derive(Clone, Debug, Default)]
pub struct NodeHandle(Rc<Cell<Option<NodeId>>>);

impl NodeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The observed node, or `None` once it is gone or the handle was replaced.
    #[inline]
    pub fn get(&self) -> Option<NodeId> {
        self.0.get()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0.get().is_some()
    }

    /// True when both values are clones of the same handle.
    #[inline]
    pub fn same(&self, other: &NodeHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[inline]
    pub(crate) fn set(&self, id: Option<NodeId>) {
        self.0.set(id);
    }
}
