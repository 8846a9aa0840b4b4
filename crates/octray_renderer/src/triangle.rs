//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection and the
//! separating axis test for triangle-box overlap.

use crate::geometry::{Geometry, GeometryId, HitRecord};
use octray_math::{Aabb, Interval, Ray, Vec3};

/// Determinant below which a ray counts as parallel to the triangle plane.
const PARALLEL_EPSILON: f32 = 1e-8;

/// A triangle primitive.
#[derive(Debug, Clone)]
pub struct Triangle {
    id: GeometryId,
    /// Vertices
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Pre-computed face normal (unit length)
    normal: Vec3,
    bbox: Aabb,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    ///
    /// The face normal follows the winding `v0 -> v1 -> v2`.
    pub fn new(id: GeometryId, v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        let bbox = Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2));

        Self {
            id,
            v0,
            v1,
            v2,
            normal,
            bbox,
        }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

impl Geometry for Triangle {
    fn id(&self) -> GeometryId {
        self.id
    }

    /// Möller-Trumbore ray-triangle intersection algorithm.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < PARALLEL_EPSILON {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);

        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);

        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * edge2.dot(q);
        if !ray_t.contains(t) {
            return false;
        }

        rec.t = t;
        rec.p = ray.at(t);
        rec.set_face_normal(ray, self.normal);

        true
    }

    /// Separating axis test: box face normals, triangle normal, and the nine
    /// edge cross products. Touching counts as intersecting.
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        if !self.bbox.overlaps(aabb) {
            return false;
        }

        let center = aabb.centroid();
        let half = aabb.extent() * 0.5;
        let v = [self.v0 - center, self.v1 - center, self.v2 - center];

        let separated_on = |axis: Vec3| {
            let p0 = v[0].dot(axis);
            let p1 = v[1].dot(axis);
            let p2 = v[2].dot(axis);
            let r = half.dot(axis.abs());
            p0.min(p1).min(p2) > r || p0.max(p1).max(p2) < -r
        };

        let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];
        for box_axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            for edge in edges {
                let axis = box_axis.cross(edge);
                if axis != Vec3::ZERO && separated_on(axis) {
                    return false;
                }
            }
        }

        let n = edges[0].cross(edges[1]);
        !(n != Vec3::ZERO && separated_on(n))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn collect_in_aabb<'a>(&'a self, aabb: &Aabb, out: &mut Vec<&'a dyn Geometry>) {
        if self.intersects_aabb(aabb) {
            out.push(self);
        }
    }
}
