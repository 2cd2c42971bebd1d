//! Transform node: the grouping node and root of every model tree.

use crate::util::{DMat4, DVec3, Point3, UnitVector3};

use super::{Attach, Link, NodeId, NodeKind, Slots};

/// Rigid/affine transform with child transforms and shapes.
///
/// Composition follows VRML `Transform` semantics:
/// `P' = T * C * R * SR * S * -SR * -C * P`.
#[derive(Clone, Debug)]
pub struct Transform {
    pub center: Point3,
    pub translation: Point3,
    pub rotation_axis: UnitVector3,
    /// Radians.
    pub rotation_angle: f64,
    pub scale: DVec3,
    pub scale_axis: UnitVector3,
    /// Radians.
    pub scale_angle: f64,

    transforms: Vec<NodeId>,
    ref_transforms: Vec<NodeId>,
    shapes: Vec<NodeId>,
    ref_shapes: Vec<NodeId>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            center: Point3::ZERO,
            translation: Point3::ZERO,
            rotation_axis: UnitVector3::Z,
            rotation_angle: 0.0,
            scale: DVec3::ONE,
            scale_axis: UnitVector3::Z,
            scale_angle: 0.0,
            transforms: Vec::new(),
            ref_transforms: Vec::new(),
            shapes: Vec::new(),
            ref_shapes: Vec::new(),
        }
    }
}

impl Transform {
    pub fn set_translation(&mut self, t: Point3) {
        self.translation = t;
    }

    pub fn set_center(&mut self, c: Point3) {
        self.center = c;
    }

    pub fn set_rotation(&mut self, axis: UnitVector3, angle: f64) {
        self.rotation_axis = axis;
        self.rotation_angle = angle;
    }

    pub fn set_scale(&mut self, s: DVec3) {
        self.scale = s;
    }

    pub fn set_scale_orientation(&mut self, axis: UnitVector3, angle: f64) {
        self.scale_axis = axis;
        self.scale_angle = angle;
    }

    /// Local transform matrix.
    pub fn local_matrix(&self) -> DMat4 {
        let t = DMat4::from_translation(self.translation);
        let c = DMat4::from_translation(self.center);
        let nc = DMat4::from_translation(-self.center);
        let r = DMat4::from_axis_angle(self.rotation_axis.get(), self.rotation_angle);
        let sr = DMat4::from_axis_angle(self.scale_axis.get(), self.scale_angle);
        let nsr = DMat4::from_axis_angle(self.scale_axis.get(), -self.scale_angle);
        let s = DMat4::from_scale(self.scale);

        t * c * r * sr * s * nsr * nc
    }

    #[inline]
    pub fn transforms(&self) -> &[NodeId] {
        &self.transforms
    }

    #[inline]
    pub fn ref_transforms(&self) -> &[NodeId] {
        &self.ref_transforms
    }

    #[inline]
    pub fn shapes(&self) -> &[NodeId] {
        &self.shapes
    }

    #[inline]
    pub fn ref_shapes(&self) -> &[NodeId] {
        &self.ref_shapes
    }

    /// True when there is nothing under this transform.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
            && self.ref_transforms.is_empty()
            && self.shapes.is_empty()
            && self.ref_shapes.is_empty()
    }

    fn lists_mut(&mut self, kind: NodeKind) -> Option<(&mut Vec<NodeId>, &mut Vec<NodeId>)> {
        match kind {
            NodeKind::Transform => Some((&mut self.transforms, &mut self.ref_transforms)),
            NodeKind::Shape => Some((&mut self.shapes, &mut self.ref_shapes)),
            _ => None,
        }
    }
}

impl Slots for Transform {
    fn attach(&mut self, kind: NodeKind, link: Link) -> Attach {
        let Some((owned, refs)) = self.lists_mut(kind) else {
            return Attach::Unsupported;
        };
        let id = link.id();
        if owned.contains(&id) || refs.contains(&id) {
            return Attach::Present;
        }
        match link {
            Link::Owned(_) => owned.push(id),
            Link::Ref(_) => refs.push(id),
        }
        Attach::Added
    }

    fn detach(&mut self, id: NodeId, owned: bool) -> bool {
        let lists = if owned {
            [&mut self.transforms, &mut self.shapes]
        } else {
            [&mut self.ref_transforms, &mut self.ref_shapes]
        };
        for list in lists {
            if let Some(pos) = list.iter().position(|&n| n == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    fn owned_children(&self) -> Vec<NodeId> {
        self.transforms.iter().chain(&self.shapes).copied().collect()
    }

    fn references(&self) -> Vec<NodeId> {
        self.ref_transforms.iter().chain(&self.ref_shapes).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::DVec4;

    fn close(a: DVec3, b: DVec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn test_identity() {
        let t = Transform::default();
        assert_eq!(t.local_matrix(), DMat4::IDENTITY);
    }

    #[test]
    fn test_translate_then_rotate() {
        let mut t = Transform::default();
        t.set_translation(DVec3::new(10.0, 0.0, 0.0));
        t.set_rotation(UnitVector3::Z, std::f64::consts::FRAC_PI_2);
        let p = t.local_matrix() * DVec4::new(1.0, 0.0, 0.0, 1.0);
        assert!(close(p.truncate(), DVec3::new(10.0, 1.0, 0.0)));
    }

    #[test]
    fn test_center_pivot() {
        let mut t = Transform::default();
        t.set_center(DVec3::new(1.0, 0.0, 0.0));
        t.set_scale(DVec3::splat(2.0));
        // the center is a fixed point of the scale
        let p = t.local_matrix() * DVec4::new(1.0, 0.0, 0.0, 1.0);
        assert!(close(p.truncate(), DVec3::new(1.0, 0.0, 0.0)));
        let q = t.local_matrix() * DVec4::new(2.0, 0.0, 0.0, 1.0);
        assert!(close(q.truncate(), DVec3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn test_scale_orientation() {
        let mut t = Transform::default();
        t.set_scale(DVec3::new(2.0, 1.0, 1.0));
        t.set_scale_orientation(UnitVector3::Z, std::f64::consts::FRAC_PI_2);
        // scaling happens along the rotated x axis, i.e. world y
        let p = t.local_matrix() * DVec4::new(0.0, 1.0, 0.0, 1.0);
        assert!(close(p.truncate(), DVec3::new(0.0, 2.0, 0.0)));
    }
}
