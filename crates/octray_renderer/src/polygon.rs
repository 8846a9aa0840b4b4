//! Polygon aggregate: an ordered collection of triangles.

use crate::geometry::{Geometry, GeometryId, HitRecord};
use crate::triangle::Triangle;
use octray_math::{Aabb, Interval, Ray, Vec3};

/// A polygonal surface built from triangles.
///
/// Behaves as one object for ray tests, but hands its individual triangles
/// to the octree so leaves never hold the whole aggregate.
#[derive(Debug, Clone)]
pub struct Polygon {
    id: GeometryId,
    triangles: Vec<Triangle>,
    bbox: Aabb,
}

impl Polygon {
    /// Build a polygon from vertex triples.
    ///
    /// Each triangle gets an id derived from `id` and its position, so every
    /// member stays distinct from other scene objects and from its siblings.
    pub fn from_vertices(id: u32, faces: &[[Vec3; 3]]) -> Self {
        let triangles = faces
            .iter()
            .enumerate()
            .map(|(i, [a, b, c])| Triangle::new(GeometryId::derived(id, i as u32), *a, *b, *c))
            .collect();
        Self::from_triangles(GeometryId::new(id), triangles)
    }

    /// Wrap already constructed triangles. The caller guarantees their ids are unique.
    pub fn from_triangles(id: GeometryId, triangles: Vec<Triangle>) -> Self {
        let bbox = triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bounding_box()));
        Self { id, triangles, bbox }
    }

    /// Planar quad `a b c d` (counter-clockwise) split into two triangles.
    pub fn quad(id: u32, a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Self {
        Self::from_vertices(id, &[[a, b, c], [a, c, d]])
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

impl Geometry for Polygon {
    fn id(&self) -> GeometryId {
        self.id
    }

    /// Closest hit among the member triangles.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let mut hit_anything = false;
        let mut closest_so_far = ray_t.max;

        for triangle in &self.triangles {
            if triangle.hit(ray, ray_t.with_max(closest_so_far), rec) {
                hit_anything = true;
                closest_so_far = rec.t;
            }
        }

        hit_anything
    }

    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.triangles.iter().any(|t| t.intersects_aabb(aabb))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn collect_in_aabb<'a>(&'a self, aabb: &Aabb, out: &mut Vec<&'a dyn Geometry>) {
        for triangle in &self.triangles {
            triangle.collect_in_aabb(aabb, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit square in the XZ plane at y=0, facing +Y.
    fn floor() -> Polygon {
        Polygon::quad(
            3,
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, -1.0),
        )
    }

    #[test]
    fn test_quad_triangles_have_distinct_derived_ids() {
        let poly = floor();
        assert_eq!(poly.len(), 2);
        assert_eq!(poly.id(), GeometryId::new(3));
        assert_eq!(poly.triangles()[0].id(), GeometryId::derived(3, 0));
        assert_eq!(poly.triangles()[1].id(), GeometryId::derived(3, 1));
        assert!((poly.triangles()[0].normal() - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn test_polygon_hit_either_triangle() {
        let poly = floor();
        let window = Interval::new(0.001, f32::INFINITY);
        let mut rec = HitRecord::default();

        for x in [-0.8, 0.8] {
            for z in [-0.8, 0.8] {
                let ray = Ray::new(Vec3::new(x, 2.0, z), -Vec3::Y);
                assert!(poly.hit(&ray, window, &mut rec), "missed at ({x}, {z})");
                assert!((rec.t - 2.0).abs() < 1e-5);
            }
        }

        let ray = Ray::new(Vec3::new(1.5, 2.0, 0.0), -Vec3::Y);
        assert!(!poly.hit(&ray, window, &mut rec));
    }

    #[test]
    fn test_polygon_collects_members_not_itself() {
        let poly = floor();
        let mut out = Vec::new();

        // Corner box on the first triangle's side of the x + z = 0 diagonal
        let corner = Aabb::from_points(Vec3::new(0.6, -0.1, 0.6), Vec3::new(1.0, 0.1, 1.0));
        poly.collect_in_aabb(&corner, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), GeometryId::derived(3, 0));

        out.clear();
        poly.collect_in_aabb(&Aabb::cube(2.0), &mut out);
        let ids: Vec<_> = out.iter().map(|g| g.id()).collect();
        assert_eq!(ids, vec![GeometryId::derived(3, 0), GeometryId::derived(3, 1)]);
        assert!(!ids.contains(&poly.id()));
    }

    #[test]
    fn test_polygon_bounding_box() {
        let bbox = floor().bounding_box();
        assert_eq!(bbox.min, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 0.0, 1.0));
    }
}
