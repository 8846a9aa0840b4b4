//! Sphere primitive for ray tracing.

use crate::geometry::{Geometry, GeometryId, HitRecord};
use octray_math::{Aabb, Interval, Ray, Vec3};

/// A sphere primitive.
#[derive(Debug, Clone)]
pub struct Sphere {
    id: GeometryId,
    center: Vec3,
    radius: f32,
    bbox: Aabb,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(id: GeometryId, center: Vec3, radius: f32) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Self {
            id,
            center,
            radius,
            bbox,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Geometry for Sphere {
    fn id(&self) -> GeometryId {
        self.id
    }

    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return false;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.contains(root) {
            root = (h + sqrtd) / a;
            if !ray_t.contains(root) {
                return false;
            }
        }

        rec.t = root;
        rec.p = ray.at(rec.t);
        let outward_normal = ((rec.p - self.center) / self.radius).normalize_or_zero();
        rec.set_face_normal(ray, outward_normal);

        true
    }

    /// The shell crosses the box when the closest point of the box is inside
    /// the radius and the farthest corner is not.
    fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let r2 = self.radius * self.radius;
        let closest = self.center.clamp(aabb.min, aabb.max);
        let farthest = (aabb.min - self.center)
            .abs()
            .max((aabb.max - self.center).abs());
        closest.distance_squared(self.center) <= r2 && farthest.length_squared() >= r2
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

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Interval {
        Interval::new(0.001, f32::INFINITY)
    }

    #[test]
    fn test_sphere_hit() {
        let sphere = Sphere::new(GeometryId::new(0), Vec3::new(0.0, 0.0, -1.0), 0.5);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        let mut rec = HitRecord::default();
        assert!(sphere.hit(&ray, window(), &mut rec));
        assert!((rec.t - 0.5).abs() < 0.001); // Should hit at t=0.5
        assert!((rec.normal - Vec3::Z).length() < 1e-5);
        assert!(rec.front_face);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(GeometryId::new(0), Vec3::new(0.0, 0.0, -1.0), 0.5);

        // Ray pointing away from sphere
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        let mut rec = HitRecord::default();
        assert!(!sphere.hit(&ray, window(), &mut rec));
    }

    #[test]
    fn test_sphere_hit_from_inside_flips_normal() {
        let sphere = Sphere::new(GeometryId::new(0), Vec3::ZERO, 2.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        let mut rec = HitRecord::default();
        assert!(sphere.hit(&ray, window(), &mut rec));
        assert!((rec.t - 2.0).abs() < 1e-5);
        assert!(!rec.front_face);
        assert!((rec.normal + Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_sphere_respects_max_distance() {
        let sphere = Sphere::new(GeometryId::new(0), Vec3::new(0.0, 0.0, -5.0), 1.0);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));

        let mut rec = HitRecord::default();
        assert!(!sphere.hit(&ray, Interval::new(0.001, 3.0), &mut rec));
    }

    #[test]
    fn test_sphere_intersects_aabb() {
        let sphere = Sphere::new(GeometryId::new(0), Vec3::ZERO, 1.0);

        assert!(sphere.intersects_aabb(&Aabb::cube(0.75)));
        assert!(sphere.intersects_aabb(&Aabb::from_points(
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(2.0, 2.0, 0.5)
        )));
        // Box corner just outside the radius along the diagonal
        assert!(!sphere.intersects_aabb(&Aabb::from_points(Vec3::splat(0.6), Vec3::splat(2.0))));
        assert!(!sphere.intersects_aabb(&Aabb::from_points(
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(4.0, 1.0, 1.0)
        )));
    }

    #[test]
    fn test_box_inside_ball_misses_surface() {
        let sphere = Sphere::new(GeometryId::new(0), Vec3::ZERO, 4.0);

        // Strictly inside the ball, no part of the surface
        assert!(!sphere.intersects_aabb(&Aabb::cube(1.0)));
        assert!(!sphere.intersects_aabb(&Aabb::from_points(
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(2.0, 2.0, 2.0)
        )));
        // Farthest corner exactly on the surface still touches it
        assert!(sphere.intersects_aabb(&Aabb::from_points(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0))));
        // Enclosing the whole sphere
        assert!(sphere.intersects_aabb(&Aabb::cube(10.0)));

        let mut out = Vec::new();
        sphere.collect_in_aabb(&Aabb::cube(1.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_sphere_collects_itself() {
        let sphere = Sphere::new(GeometryId::new(7), Vec3::ZERO, 1.0);
        let mut out = Vec::new();

        sphere.collect_in_aabb(&Aabb::cube(1.0), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), GeometryId::new(7));

        out.clear();
        sphere.collect_in_aabb(&Aabb::from_points(Vec3::splat(5.0), Vec3::splat(6.0)), &mut out);
        assert!(out.is_empty());
    }
}
