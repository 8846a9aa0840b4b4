//! Tile-based parallel rendering.
//!
//! Divides the image into a fixed grid of tiles that are rendered
//! independently and in parallel using rayon, then blitted into the
//! frame buffer.

use crate::renderer::{color_to_pixel, render_pixel};
use crate::{Camera, FrameBuffer, Octree, Pixel, RenderConfig, RenderResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner
    pub y: u32,
    /// Width of the tile in pixels
    pub width: u32,
    /// Height of the tile in pixels
    pub height: u32,
    /// Row-major position in the tile grid, also keys the tile's RNG stream
    pub index: usize,
}

impl Tile {
    /// Create a new tile.
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self { x, y, width, height, index }
    }

    /// Get the total number of pixels in this tile.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Split an image into a `grid x grid` set of tiles.
///
/// The last column and row absorb the remainder when the image size is not
/// a multiple of the grid, so the tiles always cover every pixel exactly
/// once. An axis shorter than `grid` gets one tile per pixel.
pub fn generate_tiles(width: u32, height: u32, grid: u32) -> Vec<Tile> {
    if width == 0 || height == 0 || grid == 0 {
        return Vec::new();
    }

    let columns = spans(width, grid);
    let rows = spans(height, grid);

    let mut tiles = Vec::with_capacity(columns.len() * rows.len());
    for &(y, h) in &rows {
        for &(x, w) in &columns {
            let index = tiles.len();
            tiles.push(Tile::new(x, y, w, h, index));
        }
    }
    tiles
}

/// `(start, length)` pairs covering `0..extent` in at most `grid` pieces.
fn spans(extent: u32, grid: u32) -> Vec<(u32, u32)> {
    let count = grid.min(extent);
    let step = extent / count;
    (0..count)
        .map(|i| {
            let start = i * step;
            let len = if i + 1 == count { extent - start } else { step };
            (start, len)
        })
        .collect()
}

/// Result of rendering a tile.
#[derive(Debug, Clone)]
pub struct TileResult {
    /// The tile that was rendered
    pub tile: Tile,
    /// Quantized pixels in row-major order within the tile
    pub pixels: Vec<Pixel>,
}

impl TileResult {
    /// Create a new tile result.
    pub fn new(tile: Tile, pixels: Vec<Pixel>) -> Self {
        Self { tile, pixels }
    }

    /// Copy the tile's pixels into their place in `image`.
    pub fn blit(&self, image: &mut FrameBuffer) {
        let tile = &self.tile;
        for local_y in 0..tile.height {
            for local_x in 0..tile.width {
                let pixel = self.pixels[(local_y * tile.width + local_x) as usize];
                image.set(tile.x + local_x, tile.y + local_y, pixel);
            }
        }
    }
}

/// Render a single tile.
///
/// The tile owns its RNG, seeded from `base_seed` and the tile index, so the
/// output does not depend on which worker picks the tile up.
pub fn render_tile(
    tile: &Tile,
    camera: &Camera,
    tree: &Octree,
    image_size: (u32, u32),
    config: &RenderConfig,
    base_seed: u64,
) -> TileResult {
    let (width, height) = image_size;
    let mut rng = StdRng::seed_from_u64(base_seed ^ splitmix64(tile.index as u64));
    let mut pixels = Vec::with_capacity(tile.pixel_count() as usize);

    for local_y in 0..tile.height {
        for local_x in 0..tile.width {
            let color = render_pixel(
                camera,
                tree,
                tile.x + local_x,
                tile.y + local_y,
                width,
                height,
                config,
                &mut rng,
            );
            pixels.push(color_to_pixel(color));
        }
    }

    TileResult::new(*tile, pixels)
}

/// Render the full image.
///
/// Tiles are distributed over a rayon pool sized by `config.threads`. The
/// frame buffer is assembled once every tile has finished.
pub fn render(
    camera: &Camera,
    tree: &Octree,
    width: u32,
    height: u32,
    config: &RenderConfig,
) -> RenderResult<FrameBuffer> {
    config.validate(width, height)?;

    let base_seed = config.seed.unwrap_or_else(clock_seed);
    let tiles = generate_tiles(width, height, config.tile_grid);

    let mut builder = ThreadPoolBuilder::new();
    if let Some(threads) = config.threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;

    log::info!(
        "Rendering {}x{} in {} tiles on {} threads ({} spp, {} bounces, seed {})",
        width,
        height,
        tiles.len(),
        pool.current_num_threads(),
        config.samples_per_pixel,
        config.max_bounces,
        base_seed
    );
    let start = Instant::now();

    let results: Vec<TileResult> = pool.install(|| {
        tiles
            .par_iter()
            .map(|tile| {
                let result = render_tile(tile, camera, tree, (width, height), config, base_seed);
                log::debug!(
                    "Tile {} done ({}x{} at {},{})",
                    tile.index,
                    tile.width,
                    tile.height,
                    tile.x,
                    tile.y
                );
                result
            })
            .collect()
    });

    let mut image = FrameBuffer::new(width, height);
    for result in &results {
        result.blit(&mut image);
    }

    log::info!("Render complete in {:.2?}", start.elapsed());
    Ok(image)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// SplitMix64 finalizer, spreads neighbouring tile indices across the seed space.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::sky_gradient;
    use crate::{Color, Lambertian, OctreeConfig, RenderError, Scene, Vec3};
    use std::sync::Arc;

    fn covered(tiles: &[Tile], width: u32, height: u32) -> Vec<u32> {
        let mut hits = vec![0u32; (width * height) as usize];
        for tile in tiles {
            for y in tile.y..tile.y + tile.height {
                for x in tile.x..tile.x + tile.width {
                    hits[(y * width + x) as usize] += 1;
                }
            }
        }
        hits
    }

    #[test]
    fn test_generate_tiles_exact_fit() {
        let tiles = generate_tiles(128, 128, 2);
        assert_eq!(tiles.len(), 4); // 2x2 grid
        assert!(tiles.iter().all(|t| t.width == 64 && t.height == 64));

        let total_pixels: u32 = tiles.iter().map(|t| t.pixel_count()).sum();
        assert_eq!(total_pixels, 128 * 128);
    }

    #[test]
    fn test_generate_tiles_remainder_goes_to_last_row_and_column() {
        let tiles = generate_tiles(100, 50, 3);
        assert_eq!(tiles.len(), 9);

        // 100 / 3 = 33, last column is 34 wide; 50 / 3 = 16, last row is 18 tall
        assert_eq!(tiles[0], Tile::new(0, 0, 33, 16, 0));
        assert_eq!(tiles[2], Tile::new(66, 0, 34, 16, 2));
        assert_eq!(tiles[8], Tile::new(66, 32, 34, 18, 8));

        assert!(covered(&tiles, 100, 50).iter().all(|&n| n == 1));
    }

    #[test]
    fn test_generate_tiles_small_image() {
        let tiles = generate_tiles(3, 2, 8);
        assert_eq!(tiles.len(), 6);
        assert!(covered(&tiles, 3, 2).iter().all(|&n| n == 1));
        assert!(generate_tiles(0, 10, 4).is_empty());
    }

    #[test]
    fn test_tile_indices_are_row_major() {
        let tiles = generate_tiles(64, 64, 4);
        for (i, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.index, i);
            assert_eq!(tile.x, (i as u32 % 4) * 16);
            assert_eq!(tile.y, (i as u32 / 4) * 16);
        }
    }

    #[test]
    fn test_splitmix_spreads_indices() {
        assert_ne!(splitmix64(0), splitmix64(1));
        assert_ne!(splitmix64(1) ^ 7, splitmix64(2) ^ 7);
    }

    #[test]
    fn test_tile_result_blit() {
        let tile = Tile::new(1, 1, 2, 1, 0);
        let result = TileResult::new(tile, vec![Pixel::new(9, 9, 9), Pixel::new(5, 5, 5)]);
        let mut image = FrameBuffer::new(4, 3);
        result.blit(&mut image);

        assert_eq!(image.get(1, 1), Pixel::new(9, 9, 9));
        assert_eq!(image.get(2, 1), Pixel::new(5, 5, 5));
        assert_eq!(image.get(0, 0), Pixel::default());
    }

    const SPHERE_CENTER: Vec3 = Vec3::new(0.0, 0.0, -2.0);

    fn sphere_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_sphere(
            SPHERE_CENTER,
            1.0,
            Arc::new(Lambertian::new(Color::splat(0.3))),
        );
        scene
    }

    fn camera(width: u32, height: u32) -> Camera {
        Camera::new()
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0)
            .with_aspect_ratio(width as f32 / height as f32)
    }

    /// Closed-form test of a unit-length direction from the origin against
    /// a sphere at `SPHERE_CENTER`.
    fn direction_hits_sphere(direction: Vec3, radius: f32) -> bool {
        let b = direction.dot(SPHERE_CENTER);
        b > 0.0 && b * b - (SPHERE_CENTER.length_squared() - radius * radius) >= 0.0
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Coverage {
        Sphere,
        Sky,
        Edge,
    }

    /// Classify a pixel from the corners of the square its samples are drawn
    /// from. The radius margin absorbs the bulge of the silhouette between
    /// two corners.
    fn coverage(camera: &Camera, x: u32, y: u32, width: u32, height: u32) -> Coverage {
        let j = height - 1 - y;
        let (du, dv) = ((width - 1) as f32, (height - 1) as f32);
        let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)].map(|(ox, oy)| {
            camera
                .get_ray((x as f32 + ox) / du, (j as f32 + oy) / dv)
                .direction()
        });

        if corners.iter().all(|&d| direction_hits_sphere(d, 0.97)) {
            Coverage::Sphere
        } else if corners.iter().all(|&d| !direction_hits_sphere(d, 1.03)) {
            Coverage::Sky
        } else {
            Coverage::Edge
        }
    }

    #[test]
    fn test_render_sphere_against_sky() {
        let (width, height) = (40, 30);
        let scene = sphere_scene();
        let tree = Octree::build(&scene, &OctreeConfig::default()).unwrap();
        let camera = camera(width, height);
        let config = RenderConfig {
            samples_per_pixel: 4,
            max_bounces: 4,
            tile_grid: 4,
            seed: Some(7),
            threads: Some(2),
        };

        let image = render(&camera, &tree, width, height, &config).unwrap();
        assert_eq!(image.pixels().len(), 40 * 30);

        let mut sphere = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let actual = image.get(x, y);
                match coverage(&camera, x, y, width, height) {
                    Coverage::Sphere => {
                        // Albedo 0.3 times at most a white sky, gamma corrected
                        assert!(
                            actual.r < 160,
                            "pixel ({x}, {y}) {actual:?} looks like background"
                        );
                        sphere.push((x, y));
                    }
                    Coverage::Sky => {
                        let u = (x as f32 + 0.5) / (width - 1) as f32;
                        let v = ((height - 1 - y) as f32 + 0.5) / (height - 1) as f32;
                        let expected = color_to_pixel(sky_gradient(&camera.get_ray(u, v)));
                        for (a, e) in [(actual.r, expected.r), (actual.g, expected.g), (actual.b, expected.b)] {
                            assert!(
                                (a as i32 - e as i32).abs() <= 3,
                                "pixel ({x}, {y}): {actual:?} vs {expected:?}"
                            );
                        }
                    }
                    Coverage::Edge => {}
                }
            }
        }

        // Sample squares span u in [0, W / (W - 1)], so column x mirrors onto
        // W - 2 - x and row y onto H - y: the disc is centred on (19, 15).
        assert!(sphere.len() > 100, "only {} sphere pixels", sphere.len());
        for &(x, y) in &sphere {
            let mirror_x = (width - 2).checked_sub(x);
            let mirror_y = height.checked_sub(y).filter(|&my| my < height);
            if let Some(mx) = mirror_x {
                assert!(sphere.contains(&(mx, y)), "({x}, {y}) has no horizontal mirror");
            }
            if let Some(my) = mirror_y {
                assert!(sphere.contains(&(x, my)), "({x}, {y}) has no vertical mirror");
            }
        }
        assert!(sphere.contains(&(19, 15)));

        // Round, not square or stretched: equal spans through the centre, and
        // the corners of the bounding square stay background.
        let row: Vec<_> = sphere.iter().filter(|p| p.1 == 15).map(|p| p.0).collect();
        let column: Vec<_> = sphere.iter().filter(|p| p.0 == 19).map(|p| p.1).collect();
        assert!((row.len() as i32 - column.len() as i32).abs() <= 2);

        let half = row.len() as u32 / 2;
        let square = [
            (19 - half, 15 - half),
            (19 + half, 15 - half),
            (19 - half, 15 + half),
            (19 + half, 15 + half),
        ];
        for (x, y) in square {
            assert_eq!(coverage(&camera, x, y, width, height), Coverage::Sky, "({x}, {y})");
        }
    }

    #[test]
    fn test_render_is_deterministic_for_fixed_seed() {
        let (width, height) = (24, 16);
        let scene = sphere_scene();
        let tree = Octree::build(&scene, &OctreeConfig::default()).unwrap();
        let camera = camera(width, height);

        let single = RenderConfig {
            samples_per_pixel: 2,
            max_bounces: 3,
            tile_grid: 3,
            seed: Some(99),
            threads: Some(1),
        };
        let parallel = RenderConfig {
            threads: Some(4),
            ..single.clone()
        };

        let a = render(&camera, &tree, width, height, &single).unwrap();
        let b = render(&camera, &tree, width, height, &parallel).unwrap();
        assert_eq!(a.pixels(), b.pixels());
    }

    #[test]
    fn test_render_rejects_empty_image() {
        let scene = Scene::new();
        let tree = Octree::build(&scene, &OctreeConfig::default()).unwrap();
        let result = render(&Camera::new(), &tree, 0, 10, &RenderConfig::default());
        assert!(matches!(result, Err(RenderError::InvalidDimensions { .. })));
    }
}
