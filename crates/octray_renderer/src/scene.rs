//! Scene objects: geometry paired with a material.

use crate::{Geometry, GeometryId, Material, Polygon, Sphere};
use octray_math::Vec3;
use std::sync::Arc;

/// One renderable object.
pub struct Mesh {
    pub geometry: Box<dyn Geometry>,
    pub material: Arc<dyn Material>,
}

impl Mesh {
    pub fn new(geometry: Box<dyn Geometry>, material: Arc<dyn Material>) -> Self {
        Self { geometry, material }
    }
}

/// A list of meshes, immutable once handed to the octree.
///
/// `add_sphere` and `add_polygon` allocate ids from an internal counter, so
/// every object in the scene has a distinct identity. Meshes added through
/// [`Scene::push`] bring their own ids and the caller must keep them unique.
pub struct Scene {
    meshes: Vec<Mesh>,
    next_id: u32,
}

impl Scene {
    /// Create a new empty scene.
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            next_id: 0,
        }
    }

    /// Add a sphere with a freshly allocated id.
    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: Arc<dyn Material>) -> &mut Self {
        let id = self.allocate_id();
        self.push(Mesh::new(Box::new(Sphere::new(GeometryId::new(id), center, radius)), material))
    }

    /// Add a polygon with a freshly allocated id.
    pub fn add_polygon(&mut self, faces: &[[Vec3; 3]], material: Arc<dyn Material>) -> &mut Self {
        let id = self.allocate_id();
        self.push(Mesh::new(Box::new(Polygon::from_vertices(id, faces)), material))
    }

    /// Add a planar quad with a freshly allocated id.
    pub fn add_quad(&mut self, corners: [Vec3; 4], material: Arc<dyn Material>) -> &mut Self {
        let id = self.allocate_id();
        let [a, b, c, d] = corners;
        self.push(Mesh::new(Box::new(Polygon::quad(id, a, b, c, d)), material))
    }

    /// Add a caller-built mesh.
    pub fn push(&mut self, mesh: Mesh) -> &mut Self {
        self.meshes.push(mesh);
        self
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Get the number of meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Check if the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
