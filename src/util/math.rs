//! Value primitives shared by every node type.
//!
//! Points and matrices come from `glam` (double precision inside the graph,
//! single precision in the flattened render model). [`Color`] and
//! [`UnitVector3`] validate on construction.

pub use glam::{DMat4, DVec3, DVec4, Mat4, Vec3};

use bytemuck::{Pod, Zeroable};
use std::fmt;
use tracing::warn;

/// A point in model space, millimetres.
pub type Point3 = DVec3;

/// Squared length below which a vector is considered unusable.
const MIN_VECTOR_LENGTH_SQ: f64 = 1e-8;

const UNIT_TOLERANCE: f64 = 1e-12;

/// RGB color with every channel in `[0, 1]`.
#[derive(Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    r: f32,
    g: f32,
    b: f32,
}

impl Color {
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0 };

    /// Create a color, or `None` if any channel lies outside `[0, 1]`.
    pub fn try_new(r: f32, g: f32, b: f32) -> Option<Self> {
        if check_range(r, g, b) {
            Some(Self { r, g, b })
        } else {
            None
        }
    }

    /// Create a color; out-of-range input yields black.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self::try_new(r, g, b).unwrap_or_else(|| {
            warn!("invalid color ({r}, {g}, {b}); channels must be in [0, 1]");
            Self::BLACK
        })
    }

    /// Replace the channels. Returns false and leaves the color unchanged on
    /// out-of-range input.
    pub fn set(&mut self, r: f32, g: f32, b: f32) -> bool {
        match Self::try_new(r, g, b) {
            Some(c) => {
                *self = c;
                true
            }
            None => {
                warn!("invalid color ({r}, {g}, {b}); channels must be in [0, 1]");
                false
            }
        }
    }

    #[inline]
    pub fn rgb(&self) -> (f32, f32, f32) {
        (self.r, self.g, self.b)
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// Relative luminance (Rec. 709 weights).
    pub fn luminance(&self) -> f32 {
        0.212671 * self.r + 0.71516 * self.g + 0.072169 * self.b
    }
}

fn check_range(r: f32, g: f32, b: f32) -> bool {
    let ok = |v: f32| (0.0..=1.0).contains(&v);
    ok(r) && ok(g) && ok(b)
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color({}, {}, {})", self.r, self.g, self.b)
    }
}

/// A direction normalized at construction.
///
/// Input shorter than `1e-4` falls back to `+Z`.
#[derive(Clone, Copy, PartialEq)]
pub struct UnitVector3(DVec3);

impl UnitVector3 {
    pub const Z: Self = Self(DVec3::Z);

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_dvec3(DVec3::new(x, y, z))
    }

    pub fn from_dvec3(v: DVec3) -> Self {
        let len_sq = v.length_squared();
        if !(len_sq >= MIN_VECTOR_LENGTH_SQ) {
            return Self::Z;
        }
        // already unit length: keep bit-exact so stored normals round-trip
        if (len_sq - 1.0).abs() < UNIT_TOLERANCE {
            return Self(v);
        }
        Self(v / len_sq.sqrt())
    }

    #[inline]
    pub fn get(&self) -> DVec3 {
        self.0
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.0.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.0.y
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.0.z
    }
}

impl Default for UnitVector3 {
    fn default() -> Self {
        Self::Z
    }
}

impl From<DVec3> for UnitVector3 {
    fn from(v: DVec3) -> Self {
        Self::from_dvec3(v)
    }
}

impl fmt::Debug for UnitVector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitVector3({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}

/// 3D bounding box with single precision.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BBox3f {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox3f {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl Default for BBox3f {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BBox3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox3f({:?} - {:?})", self.min, self.max)
    }
}
