//! Error type shared by the renderer.

use octray_math::{AabbError, Vec3};
use thiserror::Error;

/// Errors that can occur while building the octree or rendering.
///
/// Geometric edge cases (parallel rays, degenerate scatter directions) are
/// never reported here; they resolve to a miss or a fallback at the call site.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("World bounds must have positive volume, got min {min} max {max}")]
    InvalidWorldBounds { min: Vec3, max: Vec3 },

    #[error("Octree depth {depth} exceeds the limit of {limit}")]
    InvalidOctreeDepth { depth: u32, limit: u32 },

    #[error("Invalid bounds: {0}")]
    InvalidBounds(#[from] AabbError),

    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Tile grid must be at least 1, got {0}")]
    InvalidTileGrid(u32),

    #[error("Samples per pixel must be at least 1")]
    InvalidSampleCount,

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
