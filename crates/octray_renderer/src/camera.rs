//! Camera for ray generation.

use octray_math::{Ray, Vec3};

/// Pinhole camera mapping normalized image-plane coordinates to rays.
///
/// `u` runs left to right and `v` bottom to top, both in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Camera {
    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    // Lens settings
    vfov: f32, // Vertical field of view in degrees
    aspect_ratio: f32,

    // Cached computed values (set by initialize())
    origin: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    lower_left_corner: Vec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        let mut camera = Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            aspect_ratio: 4.0 / 3.0,
            origin: Vec3::ZERO,
            horizontal: Vec3::ZERO,
            vertical: Vec3::ZERO,
            lower_left_corner: Vec3::ZERO,
        };
        camera.initialize();
        camera
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    /// Set vertical field of view in degrees.
    pub fn with_lens(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self.initialize();
        self
    }

    /// Set the width / height ratio of the image plane.
    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self.initialize();
        self
    }

    /// Recompute the image plane from the current settings.
    pub fn initialize(&mut self) {
        let theta = self.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * self.aspect_ratio;

        // Calculate camera basis vectors
        let w = (self.look_from - self.look_at).normalize();
        let u = self.vup.cross(w).normalize();
        let v = w.cross(u);

        self.origin = self.look_from;
        self.horizontal = viewport_width * u;
        self.vertical = viewport_height * v;
        self.lower_left_corner = self.origin - self.horizontal / 2.0 - self.vertical / 2.0 - w;
    }

    /// Generate the ray through image-plane point `(u, v)`.
    ///
    /// The direction is normalized.
    pub fn get_ray(&self, u: f32, v: f32) -> Ray {
        let direction =
            self.lower_left_corner + u * self.horizontal + v * self.vertical - self.origin;
        Ray::new(self.origin, direction.normalize())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
