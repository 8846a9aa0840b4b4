//! Material trait for surface scattering.

use crate::{gen_f32, geometry::HitRecord};
use octray_math::{lerp_vec3, near_zero, Ray, Vec3};
use rand::RngCore;
use std::f32::consts::PI;

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// How much of the emitted color shows through on a light's surface.
const EMISSION_BLEND: f32 = 0.2;

/// Outcome of a scatter event.
#[derive(Debug, Clone, Copy)]
pub struct ScatterResult {
    /// Fraction of light retained, or the final radiance when `scattered` is `None`.
    pub attenuation: Color,
    /// Continuation ray; `None` marks an emissive, terminal surface.
    pub scattered: Option<Ray>,
}

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync {
    /// Scatter an incoming ray at the given hit.
    ///
    /// When the result carries no scattered ray the caller must treat the
    /// attenuation as emitted radiance and stop recursing.
    fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult;
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    /// Create a new Lambertian material with the given albedo color.
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn scatter(&self, _ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult {
        let direction = scatter_direction(rec.normal, random_in_unit_sphere(rng));

        ScatterResult {
            attenuation: self.albedo,
            scattered: Some(Ray::new(rec.p, direction)),
        }
    }
}

/// Diffuse light emitter.
///
/// Never scatters. The surface color is mostly the emission with a little of
/// the albedo blended in.
#[derive(Debug, Clone)]
pub struct DiffuseLight {
    albedo: Color,
    emit: Color,
}

impl DiffuseLight {
    /// Create a new diffuse light with the given emission color.
    pub fn new(emit: Color) -> Self {
        Self::with_albedo(emit, emit)
    }

    /// Light whose visible surface mixes `albedo` into the emission.
    pub fn with_albedo(albedo: Color, emit: Color) -> Self {
        Self { albedo, emit }
    }

    /// Radiance returned for every hit.
    pub fn radiance(&self) -> Color {
        lerp_vec3(self.albedo, self.emit, EMISSION_BLEND)
    }
}

impl Material for DiffuseLight {
    fn scatter(&self, _ray_in: &Ray, _rec: &HitRecord, _rng: &mut dyn RngCore) -> ScatterResult {
        ScatterResult {
            attenuation: self.radiance(),
            scattered: None,
        }
    }
}

/// Normal plus the normalized sample, or the normal itself if they cancel out.
fn scatter_direction(normal: Vec3, sample: Vec3) -> Vec3 {
    let direction = normal + sample.normalize_or_zero();
    if near_zero(direction) {
        normal
    } else {
        direction
    }
}

/// Random point inside the unit sphere, uniform in volume.
///
/// Rejection free: uniform azimuth, inverse-CDF polar angle, cube-root radius.
pub fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    let phi = 2.0 * PI * gen_f32(rng);
    let cos_theta = 1.0 - 2.0 * gen_f32(rng);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let r = gen_f32(rng).cbrt();

    Vec3::new(
        r * sin_theta * phi.cos(),
        r * sin_theta * phi.sin(),
        r * cos_theta,
    )
}
