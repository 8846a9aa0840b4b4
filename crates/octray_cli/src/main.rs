use anyhow::{Context, Result};
use clap::Parser;
use octray_math::{Aabb, Vec3};
use octray_renderer::{
    render, save_ppm, Camera, Color, DiffuseLight, Lambertian, Material, Octree, OctreeConfig,
    RenderConfig, Scene, DEFAULT_MAX_DEPTH, DEFAULT_WORLD_SIZE,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Render the demo scene with the octree path tracer and write a PPM image.
#[derive(Debug, Parser)]
#[command(name = "octray", version, about)]
struct Args {
    /// PPM output path
    #[arg(short, long, default_value = "image.ppm")]
    output: PathBuf,

    /// Image width in pixels
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Samples per pixel
    #[arg(short, long, default_value_t = 100)]
    spp: u32,

    /// Maximum ray bounces
    #[arg(short = 'd', long, default_value_t = 10)]
    max_bounces: u32,

    /// Tile grid size, the image is split into tiles x tiles regions
    #[arg(long, default_value_t = 8)]
    tiles: u32,

    /// Octree max depth
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    octree_depth: u32,

    /// Half extent of the world cube indexed by the octree
    #[arg(long, default_value_t = DEFAULT_WORLD_SIZE)]
    world_size: f32,

    /// Write a JSON dump of the octree to this path
    #[arg(long)]
    dump_tree: Option<PathBuf>,

    /// Base RNG seed, the system clock when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads, rayon's default when absent
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Starting octray");

    let (octree_config, config) = configs(&args)?;

    let start = Instant::now();
    let scene = build_scene();
    log::info!("Scene built with {} meshes in {:.2?}", scene.len(), start.elapsed());

    let tree = Octree::build(&scene, &octree_config).context("failed to build octree")?;

    if let Some(path) = &args.dump_tree {
        tree.write_debug_dump(path)
            .with_context(|| format!("failed to write octree dump to {}", path.display()))?;
    }

    let camera = Camera::new()
        .with_position(
            Vec3::new(0.0, 0.0, -1.0), // look_from
            Vec3::new(0.0, -0.3, 1.0), // look_at
            Vec3::Y,                   // vup
        )
        .with_lens(70.0)
        .with_aspect_ratio(args.width as f32 / args.height as f32);

    let image = render(&camera, &tree, args.width, args.height, &config).context("render failed")?;
    save_ppm(&image, &args.output)
        .with_context(|| format!("failed to write image to {}", args.output.display()))?;

    Ok(())
}

/// Map the flags onto the library configs, rejecting bad values before any work.
fn configs(args: &Args) -> Result<(OctreeConfig, RenderConfig)> {
    let octree_config = OctreeConfig {
        world_bounds: Aabb::cube(args.world_size),
        max_depth: args.octree_depth,
    };
    octree_config.validate().context("invalid octree settings")?;

    let config = RenderConfig {
        samples_per_pixel: args.spp,
        max_bounces: args.max_bounces,
        tile_grid: args.tiles,
        seed: args.seed,
        threads: args.threads,
    };
    config
        .validate(args.width, args.height)
        .context("invalid render settings")?;

    Ok((octree_config, config))
}

/// Three diffuse spheres on a ground quad, lit by the sky and a small lamp.
fn build_scene() -> Scene {
    let grey: Arc<dyn Material> = Arc::new(Lambertian::new(Color::new(0.7, 0.7, 0.7)));
    let pink: Arc<dyn Material> = Arc::new(Lambertian::new(Color::new(1.0, 0.7, 0.7)));
    let ground: Arc<dyn Material> = Arc::new(Lambertian::new(Color::new(0.5, 0.5, 0.45)));
    let lamp: Arc<dyn Material> = Arc::new(DiffuseLight::with_albedo(
        Color::new(1.0, 0.9, 0.7),
        Color::new(4.0, 3.6, 2.8),
    ));

    let mut scene = Scene::new();
    scene
        .add_sphere(Vec3::new(0.0, -1.0, 1.0), 0.5, grey.clone())
        .add_sphere(Vec3::new(0.0, 0.0, 1.0), 0.5, grey)
        .add_sphere(Vec3::new(1.0, 0.0, 1.0), 0.5, pink)
        .add_sphere(Vec3::new(-1.2, 1.2, 2.0), 0.3, lamp)
        .add_quad(
            [
                Vec3::new(-8.0, -1.5, -8.0),
                Vec3::new(8.0, -1.5, -8.0),
                Vec3::new(8.0, -1.5, 8.0),
                Vec3::new(-8.0, -1.5, 8.0),
            ],
            ground,
        );
    scene
}
