//! Sparse Density Grids
//!
//! `SparseGrid` is the read-only contract the baker consumes: a transform,
//! the active index bounds, and point sampling in index space.
//! `SparseVoxelGrid` is the in-crate implementation: 8³ leaf blocks keyed by
//! their origin, each with an occupancy mask, over a constant background.

use std::collections::HashMap;

use glam::{IVec3, Vec3};

use super::transform::GridTransform;

/// Edge length of a leaf block in voxels.
pub const LEAF_EDGE: i32 = 8;

/// Voxels per leaf block (8³).
pub const LEAF_VOXELS: usize = (LEAF_EDGE * LEAF_EDGE * LEAF_EDGE) as usize;

/// Read-only density grid, immutable once decoded.
pub trait SparseGrid {
    /// Grid name as stored in the container.
    fn name(&self) -> &str;

    /// Index ↔ world transform.
    fn transform(&self) -> &GridTransform;

    /// Inclusive index-space bounds of the active voxels, `None` when empty.
    fn active_index_bounds(&self) -> Option<(IVec3, IVec3)>;

    /// Density at an index-space point (nearest voxel, background outside).
    fn value_at(&self, index_point: Vec3) -> f32;
}

/// One 8³ block of voxel values.
#[derive(Clone, Debug)]
struct LeafNode {
    values: [f32; LEAF_VOXELS],
    active_mask: [u64; LEAF_VOXELS / 64],
}

impl LeafNode {
    fn new(background: f32) -> Self {
        Self {
            values: [background; LEAF_VOXELS],
            active_mask: [0; LEAF_VOXELS / 64],
        }
    }

    #[inline]
    fn offset(local: IVec3) -> usize {
        (local.x + local.y * LEAF_EDGE + local.z * LEAF_EDGE * LEAF_EDGE) as usize
    }

    #[inline]
    fn is_active(&self, offset: usize) -> bool {
        self.active_mask[offset / 64] & (1u64 << (offset % 64)) != 0
    }

    fn set(&mut self, offset: usize, value: f32) {
        self.values[offset] = value;
        self.active_mask[offset / 64] |= 1u64 << (offset % 64);
    }

    fn active_count(&self) -> u32 {
        self.active_mask.iter().map(|word| word.count_ones()).sum()
    }

    fn active_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..LEAF_VOXELS).filter(|&offset| self.is_active(offset))
    }
}

/// Sparse voxel grid stored as a map of 8³ leaf blocks.
#[derive(Clone, Debug)]
pub struct SparseVoxelGrid {
    name: String,
    transform: GridTransform,
    background: f32,
    leaves: HashMap<IVec3, LeafNode>,
}

impl SparseVoxelGrid {
    pub fn new(name: impl Into<String>, transform: GridTransform, background: f32) -> Self {
        Self {
            name: name.into(),
            transform,
            background,
            leaves: HashMap::new(),
        }
    }

    #[inline]
    fn split(coord: IVec3) -> (IVec3, IVec3) {
        let origin = IVec3::new(
            coord.x.div_euclid(LEAF_EDGE),
            coord.y.div_euclid(LEAF_EDGE),
            coord.z.div_euclid(LEAF_EDGE),
        ) * LEAF_EDGE;
        (origin, coord - origin)
    }

    /// Sets (and activates) one voxel.
    pub fn set_value(&mut self, coord: IVec3, value: f32) {
        let (origin, local) = Self::split(coord);
        let background = self.background;
        self.leaves
            .entry(origin)
            .or_insert_with(|| LeafNode::new(background))
            .set(LeafNode::offset(local), value);
    }

    /// Activates every voxel in the inclusive index box `[min, max]`.
    pub fn fill_box(&mut self, min: IVec3, max: IVec3, value: f32) {
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    self.set_value(IVec3::new(x, y, z), value);
                }
            }
        }
    }

    /// Value stored at an integer coordinate (background when inactive).
    pub fn value(&self, coord: IVec3) -> f32 {
        let (origin, local) = Self::split(coord);
        match self.leaves.get(&origin) {
            Some(leaf) => {
                let offset = LeafNode::offset(local);
                if leaf.is_active(offset) {
                    leaf.values[offset]
                } else {
                    self.background
                }
            }
            None => self.background,
        }
    }

    pub fn background(&self) -> f32 {
        self.background
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn active_voxel_count(&self) -> u64 {
        self.leaves.values().map(|leaf| leaf.active_count() as u64).sum()
    }
}

impl SparseGrid for SparseVoxelGrid {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> &GridTransform {
        &self.transform
    }

    fn active_index_bounds(&self) -> Option<(IVec3, IVec3)> {
        let mut bounds: Option<(IVec3, IVec3)> = None;
        for (origin, leaf) in &self.leaves {
            for offset in leaf.active_offsets() {
                let offset = offset as i32;
                let local = IVec3::new(
                    offset % LEAF_EDGE,
                    (offset / LEAF_EDGE) % LEAF_EDGE,
                    offset / (LEAF_EDGE * LEAF_EDGE),
                );
                let coord = *origin + local;
                bounds = Some(match bounds {
                    Some((min, max)) => (min.min(coord), max.max(coord)),
                    None => (coord, coord),
                });
            }
        }
        bounds
    }

    fn value_at(&self, index_point: Vec3) -> f32 {
        if !index_point.is_finite() {
            return self.background;
        }
        self.value(index_point.floor().as_ivec3())
    }
}
