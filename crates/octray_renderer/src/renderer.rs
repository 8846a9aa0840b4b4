//! Core path tracing renderer.
//!
//! Implements Monte Carlo path tracing with:
//! - Octree candidate lookup and closest-hit resolution
//! - Recursive scattering with an explicit bounce budget
//! - Anti-aliasing via jittered multi-sampling
//! - Gamma correction and 8-bit quantization

use crate::{gen_f32, Camera, Color, HitRecord, IntersectCandidate, Material, Octree, RenderError, RenderResult};
use octray_math::{lerp, Interval, Ray};
use rand::RngCore;

/// Minimum hit distance, suppresses self-intersection at the ray origin.
pub const T_MIN: f32 = 0.001;

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Maximum ray bounce depth
    pub max_bounces: u32,
    /// The image is split into `tile_grid x tile_grid` tiles
    pub tile_grid: u32,
    /// Base RNG seed; the system clock when `None`
    pub seed: Option<u64>,
    /// Worker threads; rayon's default when `None`
    pub threads: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 100,
            max_bounces: 10,
            tile_grid: 8,
            seed: None,
            threads: None,
        }
    }
}

impl RenderConfig {
    /// Reject settings that would produce an empty or meaningless image.
    pub fn validate(&self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        if self.tile_grid == 0 {
            return Err(RenderError::InvalidTileGrid(self.tile_grid));
        }
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidSampleCount);
        }
        Ok(())
    }
}

/// Closest hit among `candidates`, with the material of the object hit.
///
/// The search window starts at `[T_MIN, inf)` and shrinks to the best distance
/// found so far; only a strictly closer hit replaces the current one.
pub fn find_closest_hit<'a>(
    candidates: &[IntersectCandidate<'a>],
    ray: &Ray,
) -> Option<(HitRecord, &'a dyn Material)> {
    let mut window = Interval::from_min(T_MIN);
    let mut closest = None;

    for candidate in candidates {
        let mut rec = HitRecord::default();
        if candidate.geometry.hit(ray, window, &mut rec) && rec.t < window.max {
            window = window.with_max(rec.t);
            closest = Some((rec, candidate.material));
        }
    }

    closest
}

/// Compute the color seen by a ray.
///
/// This is the core path tracing function. It traces the ray through
/// the scene, bouncing off surfaces and compounding their attenuation.
pub fn ray_color(tree: &Octree, ray: &Ray, depth: u32, rng: &mut dyn RngCore) -> Color {
    // Bounce budget exhausted: all energy absorbed
    if depth == 0 {
        return Color::ZERO;
    }

    let candidates = tree.search(ray);
    let Some((rec, material)) = find_closest_hit(&candidates, ray) else {
        return sky_gradient(ray);
    };

    let result = material.scatter(ray, &rec, rng);
    match result.scattered {
        Some(scattered) => result.attenuation * ray_color(tree, &scattered, depth - 1, rng),
        // Emissive surface, the attenuation is the final radiance
        None => result.attenuation,
    }
}

/// Compute sky gradient background.
pub fn sky_gradient(ray: &Ray) -> Color {
    let unit_direction = ray.direction().normalize();
    let a = 0.5 * (unit_direction.y + 1.0);
    let white = Color::new(1.0, 1.0, 1.0);
    let blue = Color::new(0.5, 0.7, 1.0);
    white * (1.0 - a) + blue * a
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// An 8-bit RGB pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Gamma correct a linear color and quantize it.
///
/// Each channel is clamped to `[0, 1]`, mapped onto `[0, 255]` and truncated.
pub fn color_to_pixel(color: Color) -> Pixel {
    let quantize = |c: f32| lerp(0.0, 255.0, Interval::UNIT.clamp(linear_to_gamma(c))) as u8;
    Pixel::new(quantize(color.x), quantize(color.y), quantize(color.z))
}

/// Render a single pixel with multi-sampling.
///
/// `(x, y)` has row 0 at the top of the image; the camera's `v` runs upward.
/// Returns the averaged linear color.
#[allow(clippy::too_many_arguments)]
pub fn render_pixel(
    camera: &Camera,
    tree: &Octree,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    let j = height - 1 - y;
    let u_scale = width.saturating_sub(1).max(1) as f32;
    let v_scale = height.saturating_sub(1).max(1) as f32;

    let mut pixel_color = Color::ZERO;
    for _ in 0..config.samples_per_pixel {
        let u = (x as f32 + gen_f32(rng)) / u_scale;
        let v = (j as f32 + gen_f32(rng)) / v_scale;
        let ray = camera.get_ray(u, v);
        pixel_color += ray_color(tree, &ray, config.max_bounces, rng);
    }

    // Average the samples
    pixel_color / config.samples_per_pixel as f32
}

/// Row-major frame buffer, row 0 at the top.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Pixel {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        let index = self.index(x, y);
        self.pixels[index] = pixel;
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
