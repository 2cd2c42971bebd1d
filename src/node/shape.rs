//! Shape node: pairs one appearance with one face set.

use super::{clear_slot, fill_slot, Attach, Link, NodeId, NodeKind, Slots};

#[derive(Clone, Debug, Default)]
pub struct Shape {
    appearance: Option<Link>,
    faceset: Option<Link>,
}

impl Shape {
    #[inline]
    pub fn appearance(&self) -> Option<Link> {
        self.appearance
    }

    #[inline]
    pub fn faceset(&self) -> Option<Link> {
        self.faceset
    }
}

impl Slots for Shape {
    fn attach(&mut self, kind: NodeKind, link: Link) -> Attach {
        match kind {
            NodeKind::Appearance => fill_slot(&mut self.appearance, link),
            NodeKind::FaceSet => fill_slot(&mut self.faceset, link),
            _ => Attach::Unsupported,
        }
    }

    fn detach(&mut self, id: NodeId, owned: bool) -> bool {
        clear_slot(&mut self.appearance, id, owned) || clear_slot(&mut self.faceset, id, owned)
    }

    fn owned_children(&self) -> Vec<NodeId> {
        [self.appearance, self.faceset]
            .into_iter()
            .flatten()
            .filter(|l| l.is_owned())
            .map(Link::id)
            .collect()
    }

    fn references(&self) -> Vec<NodeId> {
        [self.appearance, self.faceset]
            .into_iter()
            .flatten()
            .filter(|l| !l.is_owned())
            .map(Link::id)
            .collect()
    }
}
