//! Octray - CPU Path Tracing over an Octree
//!
//! A Monte Carlo path tracer. Scene objects are bucketed into a fixed-depth
//! octree, rays gather candidates from the leaves they pass through, and
//! image tiles are rendered in parallel.

mod camera;
mod error;
mod geometry;
mod material;
mod octree;
mod polygon;
mod ppm;
mod renderer;
mod scene;
mod sphere;
mod tile;
mod triangle;

pub use camera::Camera;
pub use error::{RenderError, RenderResult};
pub use geometry::{Geometry, GeometryId, HitRecord};
pub use material::{random_in_unit_sphere, Color, DiffuseLight, Lambertian, Material, ScatterResult};
pub use octree::{
    DumpNode, IntersectCandidate, NodeKind, Octree, OctreeConfig, OctreeNode, OctreeStats,
    DEFAULT_MAX_DEPTH, DEFAULT_WORLD_SIZE, MAX_OCTREE_DEPTH,
};
pub use polygon::Polygon;
pub use ppm::{save_ppm, write_ppm};
pub use renderer::{
    color_to_pixel, find_closest_hit, linear_to_gamma, ray_color, render_pixel, sky_gradient,
    FrameBuffer, Pixel, RenderConfig, T_MIN,
};
pub use scene::{Mesh, Scene};
pub use sphere::Sphere;
pub use tile::{generate_tiles, render, render_tile, Tile, TileResult};
pub use triangle::Triangle;

/// Re-export Vec3 and common math types from octray_math
pub use octray_math::{Aabb, Interval, Ray, Vec3};

use rand::{Rng, RngCore};

/// Uniform sample in `[0, 1)` from a type-erased generator.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}
