//! Octree acceleration structure.
//!
//! The world cube is split into eight octants down to a fixed depth. Leaves
//! at the maximum depth hold every (geometry, material) pair touching their
//! bounds; a search walks only the nodes the ray crosses and returns each
//! geometry at most once.

use crate::{Geometry, GeometryId, Material, Mesh, RenderError, RenderResult, Scene};
use octray_math::{Aabb, Ray, Vec3};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

/// Default subdivision depth.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// Default half extent of the world cube.
pub const DEFAULT_WORLD_SIZE: f32 = 10.0;

/// Deepest tree a build accepts; a depth-`d` tree can hold up to `8^d` leaves.
pub const MAX_OCTREE_DEPTH: u32 = 8;

/// Octree build settings.
#[derive(Debug, Clone, Copy)]
pub struct OctreeConfig {
    /// Cube assumed to contain the scene. Geometry outside it is never indexed.
    pub world_bounds: Aabb,
    /// Depth at which nodes become terminal.
    pub max_depth: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            world_bounds: Aabb::cube(DEFAULT_WORLD_SIZE),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl OctreeConfig {
    /// Default depth over the world box spanning `min..max`.
    pub fn with_corners(min: Vec3, max: Vec3) -> RenderResult<Self> {
        Ok(Self {
            world_bounds: Aabb::new(min, max)?,
            ..Self::default()
        })
    }

    /// Reject zero-volume, inverted or non-finite world bounds, and depths
    /// past [`MAX_OCTREE_DEPTH`].
    pub fn validate(&self) -> RenderResult<()> {
        if self.world_bounds.is_degenerate() {
            return Err(RenderError::InvalidWorldBounds {
                min: self.world_bounds.min,
                max: self.world_bounds.max,
            });
        }
        if self.max_depth > MAX_OCTREE_DEPTH {
            return Err(RenderError::InvalidOctreeDepth {
                depth: self.max_depth,
                limit: MAX_OCTREE_DEPTH,
            });
        }
        Ok(())
    }
}

/// A (geometry, material) pair eligible for intersection testing.
///
/// Both are borrowed from the [`Scene`], which outlives the tree.
#[derive(Clone, Copy)]
pub struct IntersectCandidate<'a> {
    pub geometry: &'a dyn Geometry,
    pub material: &'a dyn Material,
}

impl fmt::Debug for IntersectCandidate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntersectCandidate")
            .field("geometry", &self.geometry.id())
            .finish()
    }
}

/// What a node contributes to a search.
pub enum NodeKind<'a> {
    /// No geometry touches the node's bounds.
    Empty,
    /// Internal node with eight octant children.
    Branch(Box<[OctreeNode<'a>; 8]>),
    /// Terminal node at the maximum depth.
    Leaf(Vec<IntersectCandidate<'a>>),
}

/// Octree node covering `bounds` at `depth`.
pub struct OctreeNode<'a> {
    bounds: Aabb,
    depth: u32,
    kind: NodeKind<'a>,
}

impl<'a> OctreeNode<'a> {
    /// Recursive octree construction.
    fn build(meshes: &'a [Mesh], bounds: Aabb, depth: u32, max_depth: u32) -> Self {
        let kind = if depth < max_depth {
            if meshes.iter().any(|m| m.geometry.intersects_aabb(&bounds)) {
                let children = bounds
                    .split()
                    .map(|child| Self::build(meshes, child, depth + 1, max_depth));
                NodeKind::Branch(Box::new(children))
            } else {
                NodeKind::Empty
            }
        } else {
            let candidates = candidates_in(meshes, &bounds);
            if candidates.is_empty() {
                NodeKind::Empty
            } else {
                NodeKind::Leaf(candidates)
            }
        };

        Self { bounds, depth, kind }
    }

    /// Collect candidates along `ray`, skipping ids already in `seen`.
    fn search_into(
        &self,
        ray: &Ray,
        seen: &mut HashSet<GeometryId>,
        out: &mut Vec<IntersectCandidate<'a>>,
    ) {
        if !self.bounds.intersects_ray(ray) {
            return;
        }

        match &self.kind {
            NodeKind::Empty => {}
            NodeKind::Leaf(candidates) => {
                for candidate in candidates {
                    if seen.insert(candidate.geometry.id()) {
                        out.push(*candidate);
                    }
                }
            }
            NodeKind::Branch(children) => {
                for child in children.iter() {
                    child.search_into(ray, seen, out);
                }
            }
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn kind(&self) -> &NodeKind<'a> {
        &self.kind
    }

    /// Child nodes; empty unless this is a branch.
    pub fn children(&self) -> &[OctreeNode<'a>] {
        match &self.kind {
            NodeKind::Branch(children) => children.as_slice(),
            _ => &[],
        }
    }

    /// Stored candidates; empty unless this is a leaf.
    pub fn candidates(&self) -> &[IntersectCandidate<'a>] {
        match &self.kind {
            NodeKind::Leaf(candidates) => candidates,
            _ => &[],
        }
    }

    fn accumulate_stats(&self, stats: &mut OctreeStats) {
        stats.nodes += 1;
        stats.max_depth = stats.max_depth.max(self.depth);
        match &self.kind {
            NodeKind::Empty => stats.empty += 1,
            NodeKind::Leaf(candidates) => {
                stats.leaves += 1;
                stats.candidates += candidates.len();
            }
            NodeKind::Branch(children) => {
                stats.branches += 1;
                for child in children.iter() {
                    child.accumulate_stats(stats);
                }
            }
        }
    }

    fn to_dump(&self) -> DumpNode {
        DumpNode {
            min: self.bounds.min.to_array(),
            max: self.bounds.max.to_array(),
            depth: self.depth,
            geometry_ids: self.candidates().iter().map(|c| c.geometry.id()).collect(),
            children: self.children().iter().map(Self::to_dump).collect(),
        }
    }
}

/// Every primitive of every mesh touching `bounds`, paired with its material.
fn candidates_in<'a>(meshes: &'a [Mesh], bounds: &Aabb) -> Vec<IntersectCandidate<'a>> {
    let mut candidates = Vec::new();
    let mut pieces = Vec::new();

    for mesh in meshes {
        pieces.clear();
        mesh.geometry.collect_in_aabb(bounds, &mut pieces);
        candidates.extend(pieces.iter().map(|&geometry| IntersectCandidate {
            geometry,
            material: mesh.material.as_ref(),
        }));
    }

    candidates
}

/// Node counts gathered after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub nodes: usize,
    pub branches: usize,
    pub leaves: usize,
    pub empty: usize,
    /// Sum of candidate list lengths over all leaves.
    pub candidates: usize,
    /// Deepest node depth present in the tree.
    pub max_depth: u32,
}

/// Serialized form of a node in the debug dump.
#[derive(Debug, Serialize)]
pub struct DumpNode {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub depth: u32,
    pub geometry_ids: Vec<GeometryId>,
    pub children: Vec<DumpNode>,
}

/// Spatial index over a [`Scene`], read-only once built.
pub struct Octree<'a> {
    root: OctreeNode<'a>,
    max_depth: u32,
}

impl<'a> Octree<'a> {
    /// Build the tree over `scene`.
    ///
    /// Fails before any construction if the world bounds are degenerate.
    pub fn build(scene: &'a Scene, config: &OctreeConfig) -> RenderResult<Self> {
        config.validate()?;

        let start = Instant::now();
        let bounds = config.world_bounds;

        for mesh in scene.meshes() {
            if !mesh.geometry.bounding_box().overlaps(&bounds) {
                log::warn!(
                    "Geometry {} lies outside the world bounds and will not be indexed",
                    mesh.geometry.id()
                );
            }
        }

        let tree = Self {
            root: OctreeNode::build(scene.meshes(), bounds, 0, config.max_depth),
            max_depth: config.max_depth,
        };

        let stats = tree.stats();
        log::info!(
            "Octree built in {:?}: {} nodes, {} leaves, {} candidates (max depth {})",
            start.elapsed(),
            stats.nodes,
            stats.leaves,
            stats.candidates,
            config.max_depth
        );

        Ok(tree)
    }

    /// All candidates whose leaf bounds the ray crosses, each geometry once.
    ///
    /// Order is not meaningful.
    pub fn search(&self, ray: &Ray) -> Vec<IntersectCandidate<'a>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.root.search_into(ray, &mut seen, &mut out);
        out
    }

    pub fn root(&self) -> &OctreeNode<'a> {
        &self.root
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Count nodes by kind.
    pub fn stats(&self) -> OctreeStats {
        let mut stats = OctreeStats::default();
        self.root.accumulate_stats(&mut stats);
        stats
    }

    /// Tree structure for offline inspection.
    pub fn dump(&self) -> DumpNode {
        self.root.to_dump()
    }

    /// Write the debug dump as JSON. Diagnostic only; nothing reads it back.
    pub fn write_debug_dump(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &self.dump())?;
        writer.flush()?;

        log::info!("Wrote octree dump to {}", path.display());
        Ok(())
    }
}
