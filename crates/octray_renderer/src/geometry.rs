//! Geometry trait and HitRecord for ray-object intersection.

use octray_math::{Aabb, Interval, Ray, Vec3};
use serde::Serialize;
use std::fmt;

/// Stable identity of a piece of geometry.
///
/// Only used to collapse duplicate octree candidates, never for ordering.
/// Top-level ids fit in the low 32 bits; triangles owned by a polygon get a
/// derived id carrying the polygon id in the high bits, so the two ranges
/// cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GeometryId(u64);

impl GeometryId {
    /// Id for a top-level scene object.
    pub const fn new(id: u32) -> Self {
        Self(id as u64)
    }

    /// Id for the `index`-th member of the aggregate `parent`.
    pub const fn derived(parent: u32, index: u32) -> Self {
        Self(((parent as u64 + 1) << 32) | index as u64)
    }

    /// Raw value, as written to the debug dump.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GeometryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Record of a ray-object intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Point of intersection
    pub p: Vec3,
    /// Surface normal at intersection (unit length, always points against ray)
    pub normal: Vec3,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
}

impl Default for HitRecord {
    fn default() -> Self {
        Self {
            p: Vec3::ZERO,
            normal: Vec3::ZERO,
            t: f32::INFINITY,
            front_face: false,
        }
    }
}

impl HitRecord {
    /// Set the face normal based on ray direction and outward normal.
    ///
    /// The normal is always stored pointing against the ray direction,
    /// so we need to track whether we hit the front or back face.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        // If the ray and normal point in the same direction, we're inside
        self.front_face = ray.direction().dot(outward_normal) < 0.0;

        // Normal always points against the ray
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// Shapes the octree can index and the path tracer can hit.
pub trait Geometry: Send + Sync {
    /// Stable identity used for candidate deduplication.
    fn id(&self) -> GeometryId;

    /// Test if a ray hits this object within the given interval.
    ///
    /// Returns true if hit, and fills in the hit record. Numerical edge cases
    /// (parallel rays, missing roots) are a plain miss.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool;

    /// True if any part of the surface lies inside `aabb`.
    fn intersects_aabb(&self, aabb: &Aabb) -> bool;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;

    /// Push the pieces of this object that intersect `aabb` into `out`.
    ///
    /// Primitives push themselves. Aggregates push each intersecting member
    /// and never themselves, so octree leaves only ever hold primitives.
    fn collect_in_aabb<'a>(&'a self, aabb: &Aabb, out: &mut Vec<&'a dyn Geometry>);
}
