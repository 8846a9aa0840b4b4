use crate::{Ray, Vec3};
use thiserror::Error;

/// Octant offsets along (x, y, z) for the eight children produced by
/// [`Aabb::split`]. Child 0 sits at the min corner, child 6 at the max corner.
const OCTANTS: [(bool, bool, bool); 8] = [
    (false, false, false),
    (false, false, true),
    (true, false, true),
    (true, false, false),
    (false, true, false),
    (false, true, true),
    (true, true, true),
    (true, true, false),
];

/// Error returned when constructing a box with inverted corners.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("inverted bounds: min {min} is not <= max {max} on every axis")]
pub struct AabbError {
    pub min: Vec3,
    pub max: Vec3,
}

/// Axis-Aligned Bounding Box for the octree.
///
/// Defined by its min and max corners. `min <= max` on every axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create an AABB from its min and max corners.
    ///
    /// Fails if `min` exceeds `max` on any axis.
    pub fn new(min: Vec3, max: Vec3) -> Result<Self, AabbError> {
        if min.cmple(max).all() {
            Ok(Self { min, max })
        } else {
            Err(AabbError { min, max })
        }
    }

    /// Create an AABB from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// A cube centred on the origin extending `half_size` along each axis.
    pub fn cube(half_size: f32) -> Self {
        Self::from_points(Vec3::splat(-half_size), Vec3::splat(half_size))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Size of the box along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Enclosed volume, zero for degenerate boxes.
    pub fn volume(&self) -> f32 {
        let e = self.extent().max(Vec3::ZERO);
        e.x * e.y * e.z
    }

    /// True when any axis has zero or negative extent, or a bound is not finite.
    pub fn is_degenerate(&self) -> bool {
        !(self.min.is_finite() && self.max.is_finite()) || !self.min.cmplt(self.max).all()
    }

    /// True if `p` lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    /// True if the two boxes share any point, boundaries included.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Test if the ray's parametric line crosses this box for some `t >= 0`.
    ///
    /// Slab method using the ray's cached inverse direction: no division and
    /// no branching on the direction's sign. A ray parallel to an axis whose
    /// origin sits exactly on a face gives `0 * inf = NaN` for that axis; it
    /// lies inside the closed slab, so the axis keeps the full `t` range.
    #[inline]
    pub fn intersects_ray(&self, ray: &Ray) -> bool {
        let origin = ray.origin();
        let inv = ray.inv_direction();

        let t1 = (self.min - origin) * inv;
        let t2 = (self.max - origin) * inv;

        let in_face = t1.is_nan_mask() | t2.is_nan_mask();
        let near = Vec3::select(in_face, Vec3::NEG_INFINITY, t1.min(t2));
        let far = Vec3::select(in_face, Vec3::INFINITY, t1.max(t2));

        let t_min = near.max_element();
        let t_max = far.min_element();

        t_max >= t_min.max(0.0)
    }

    /// Split into eight octant boxes of half extent.
    ///
    /// The children cover the parent exactly; neighbours share faces, edges or
    /// corners but no volume.
    pub fn split(&self) -> [Aabb; 8] {
        let half = self.extent() * 0.5;
        let mid = self.min + half;

        OCTANTS.map(|(hx, hy, hz)| {
            let pick = |high: bool, lo: f32, mid: f32, hi: f32| {
                if high {
                    (mid, hi)
                } else {
                    (lo, mid)
                }
            };
            let (x0, x1) = pick(hx, self.min.x, mid.x, self.max.x);
            let (y0, y1) = pick(hy, self.min.y, mid.y, self.max.y);
            let (z0, z1) = pick(hz, self.min.z, mid.z, self.max.z);
            Aabb {
                min: Vec3::new(x0, y0, z0),
                max: Vec3::new(x1, y1, z1),
            }
        })
    }

    /// Static constants
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };
}
