//! Volume Baker
//!
//! Resamples a sparse grid onto a dense `resolution³` lattice and splats every
//! sample into a density buffer ready for upload as an 8-bit 3D texture.
//!
//! # Algorithm
//!
//! 1. Resolve the grid's world box and derive `step = size / resolution`.
//! 2. Convert the step and the box minimum into index space; the first sample
//!    sits half a step inside the box so samples are cell-centred.
//! 3. Walk the lattice x-fastest, then y, then z, advancing a running sample
//!    position instead of re-deriving it from the indices.
//! 4. Sample the grid, clamp to `[0, 1]` and splat into the neighbourhood
//!    `[-R, R)³` with a linear falloff, clamping each cell to 255 after every
//!    addition. With `R == 0` the sample overwrites its own cell.
//!
//! The bake is synchronous: `O(resolution³ · R³)` work on the calling thread.

use std::time::Instant;

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use super::bounds::resolve_world_box;
use super::grid::SparseGrid;
use crate::error::VolumeError;

/// Default lattice resolution per axis
pub const DEFAULT_BAKE_RESOLUTION: u32 = 128;

/// Default splat bleed radius in cells
pub const DEFAULT_BLEED_RADIUS: u32 = 2;

/// Largest accepted lattice resolution (512³ cells = 128 MiB of f32 accumulators)
pub const MAX_BAKE_RESOLUTION: u32 = 512;

/// Largest accepted bleed radius
pub const MAX_BLEED_RADIUS: u32 = 16;

/// Upper bound of a baked cell
pub const MAX_DENSITY: f32 = 255.0;

/// Bake parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Lattice cells per axis
    pub resolution: u32,
    /// Splat radius in cells (0 disables splatting)
    pub bleed_radius: u32,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_BAKE_RESOLUTION,
            bleed_radius: DEFAULT_BLEED_RADIUS,
        }
    }
}

impl BakeConfig {
    pub fn new(resolution: u32, bleed_radius: u32) -> Self {
        Self {
            resolution,
            bleed_radius,
        }
    }

    pub fn validate(&self) -> Result<(), VolumeError> {
        if self.resolution == 0 || self.resolution > MAX_BAKE_RESOLUTION {
            return Err(VolumeError::Configuration(format!(
                "bake resolution must be in 1..={MAX_BAKE_RESOLUTION}, got {}",
                self.resolution
            )));
        }
        if self.bleed_radius > MAX_BLEED_RADIUS {
            return Err(VolumeError::Configuration(format!(
                "bleed radius must be in 0..={MAX_BLEED_RADIUS}, got {}",
                self.bleed_radius
            )));
        }
        Ok(())
    }
}

/// Dense `resolution³` density accumulator, values in `[0, 255]`.
///
/// Flattened x-fastest: `x + y * res + z * res²`.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityBuffer {
    resolution: u32,
    cells: Vec<f32>,
}

impl DensityBuffer {
    pub fn new(resolution: u32) -> Self {
        let len = (resolution as usize).pow(3);
        Self {
            resolution,
            cells: vec![0.0; len],
        }
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        let res = self.resolution as usize;
        x as usize + y as usize * res + z as usize * res * res
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32, z: u32) -> f32 {
        self.cells[self.index(x, y, z)]
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Adds to a cell, clamping the running value to 255.
    #[inline]
    fn accumulate(&mut self, index: usize, amount: f32) {
        let cell = &mut self.cells[index];
        *cell = (*cell + amount).min(MAX_DENSITY);
    }

    #[inline]
    fn overwrite(&mut self, index: usize, value: f32) {
        self.cells[index] = value.min(MAX_DENSITY);
    }

    /// Converts to 8-bit texels. Fractions are truncated (127.5 → 127).
    pub fn to_texels(&self) -> Vec<u8> {
        self.cells.iter().map(|&v| quantize(v)).collect()
    }

    /// Quantised value of one cell, as it will appear in the texture.
    pub fn texel(&self, x: u32, y: u32, z: u32) -> u8 {
        quantize(self.get(x, y, z))
    }

    pub fn non_zero_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v > 0.0).count()
    }

    pub fn max_value(&self) -> f32 {
        self.cells.iter().copied().fold(0.0, f32::max)
    }
}

#[inline]
fn quantize(value: f32) -> u8 {
    value.clamp(0.0, MAX_DENSITY) as u8
}

/// Sample lattice laid over a grid's world box, in the grid's index space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lattice {
    pub resolution: u32,
    /// Index-space position of the sample of cell (0, 0, 0)
    pub origin: Vec3,
    /// Index-space distance between neighbouring samples
    pub step: Vec3,
}

impl Lattice {
    /// Builds the cell-centred lattice over the grid's resolved world box.
    ///
    /// The world-space cell size goes through the index transform as one
    /// vector, so `step` holds a true per-axis spacing only for axis-aligned
    /// transforms. Under rotation its components mix axes.
    pub fn over_grid(grid: &dyn SparseGrid, resolution: u32) -> Result<Self, VolumeError> {
        if resolution == 0 {
            return Err(VolumeError::Configuration(
                "lattice resolution must be positive".into(),
            ));
        }

        let bounds = resolve_world_box(grid).ok_or(VolumeError::DegenerateBounds {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        })?;
        if bounds.is_degenerate() {
            return Err(VolumeError::DegenerateBounds {
                min: bounds.min,
                max: bounds.max,
            });
        }

        let size = bounds.size();
        let transform = grid.transform();
        let step = transform.to_index_vector(size / resolution as f32);
        let min = transform.to_index_vector(bounds.center() - size * 0.5);
        let origin = min + step * 0.5;

        if !step.is_finite() || !origin.is_finite() {
            return Err(VolumeError::DegenerateBounds {
                min: bounds.min,
                max: bounds.max,
            });
        }

        Ok(Self {
            resolution,
            origin,
            step,
        })
    }

    /// Index-space sample position of one cell, derived directly.
    pub fn sample_point(&self, x: u32, y: u32, z: u32) -> Vec3 {
        self.origin + self.step * Vec3::new(x as f32, y as f32, z as f32)
    }

    pub fn cell_count(&self) -> u64 {
        (self.resolution as u64).pow(3)
    }

    /// Iterates every cell exactly once, x fastest.
    pub fn walk(&self) -> LatticeWalk {
        LatticeWalk {
            resolution: self.resolution,
            origin: self.origin,
            step: self.step,
            cell: [0; 3],
            target: self.origin,
            remaining: self.cell_count(),
        }
    }
}

/// One lattice sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeSample {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    /// Index-space sample position
    pub target: Vec3,
}

/// Incremental walk over a lattice.
///
/// The running `target` advances by one step per cell; when an axis wraps
/// it is reset to the origin's component on that axis, so accumulated
/// rounding never leaks into the next row or slice.
pub struct LatticeWalk {
    resolution: u32,
    origin: Vec3,
    step: Vec3,
    cell: [u32; 3],
    target: Vec3,
    remaining: u64,
}

impl Iterator for LatticeWalk {
    type Item = LatticeSample;

    fn next(&mut self) -> Option<LatticeSample> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let [x, y, z] = self.cell;
        let sample = LatticeSample {
            x,
            y,
            z,
            target: self.target,
        };

        self.cell[0] += 1;
        self.target.x += self.step.x;
        if self.cell[0] >= self.resolution {
            self.cell[0] = 0;
            self.target.x = self.origin.x;

            self.cell[1] += 1;
            self.target.y += self.step.y;
        }
        if self.cell[1] >= self.resolution {
            self.cell[1] = 0;
            self.target.y = self.origin.y;

            self.cell[2] += 1;
            self.target.z += self.step.z;
        }

        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LatticeWalk {}

/// One neighbour of a splat with its falloff weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplatTap {
    pub offset: IVec3,
    pub weight: f32,
}

/// Precomputed splat neighbourhood for a bleed radius.
///
/// Offsets span `[-R, R)` on every axis with weight
/// `clamp(1 - |offset| / (R / 2), 0, 1)`; zero-weight taps are dropped since
/// they would add nothing.
#[derive(Clone, Debug)]
pub struct SplatKernel {
    radius: u32,
    taps: Vec<SplatTap>,
}

impl SplatKernel {
    pub fn new(radius: u32) -> Self {
        let r = radius as i32;
        let half_radius = radius as f32 / 2.0;
        let mut taps = Vec::new();

        for sz in -r..r {
            for sy in -r..r {
                for sx in -r..r {
                    let offset = IVec3::new(sx, sy, sz);
                    let distance = offset.as_vec3().length();
                    let weight = (1.0 - distance / half_radius).clamp(0.0, 1.0);
                    if weight > 0.0 {
                        taps.push(SplatTap { offset, weight });
                    }
                }
            }
        }

        Self { radius, taps }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn taps(&self) -> &[SplatTap] {
        &self.taps
    }
}

/// Bakes sparse grids into density buffers.
#[derive(Clone, Debug)]
pub struct VolumeBaker {
    config: BakeConfig,
    kernel: SplatKernel,
}

impl VolumeBaker {
    pub fn new(config: BakeConfig) -> Result<Self, VolumeError> {
        config.validate()?;
        Ok(Self {
            config,
            kernel: SplatKernel::new(config.bleed_radius),
        })
    }

    pub fn config(&self) -> &BakeConfig {
        &self.config
    }

    /// Bakes one grid.
    pub fn bake_grid(&self, grid: &dyn SparseGrid) -> Result<DensityBuffer, VolumeError> {
        let started = Instant::now();
        let lattice = Lattice::over_grid(grid, self.config.resolution)?;
        log::debug!(
            "[VolumeBaker] Grid '{}': lattice origin {} step {} ({}³)",
            grid.name(),
            lattice.origin,
            lattice.step,
            lattice.resolution
        );

        let mut buffer = DensityBuffer::new(self.config.resolution);
        let mut clamped_samples = 0u64;

        for sample in lattice.walk() {
            let raw = grid.value_at(sample.target);
            let value = sanitize_density(raw);
            if value != raw {
                clamped_samples += 1;
            }
            if value == 0.0 {
                continue;
            }
            self.splat(&mut buffer, sample, value);
        }

        if clamped_samples > 0 {
            log::warn!(
                "[VolumeBaker] Grid '{}': clamped {} sample(s) outside [0, 1]",
                grid.name(),
                clamped_samples
            );
        }
        log::info!(
            "[VolumeBaker] Baked grid '{}' at {}³ (bleed {}) - {} non-zero cells in {:.1?}",
            grid.name(),
            self.config.resolution,
            self.config.bleed_radius,
            buffer.non_zero_count(),
            started.elapsed()
        );

        Ok(buffer)
    }

    /// Bakes every grid independently, failing on the first error.
    pub fn bake_all(&self, grids: &[Box<dyn SparseGrid>]) -> Result<Vec<DensityBuffer>, VolumeError> {
        grids.iter().map(|grid| self.bake_grid(grid.as_ref())).collect()
    }

    fn splat(&self, buffer: &mut DensityBuffer, sample: LatticeSample, value: f32) {
        let own = buffer.index(sample.x, sample.y, sample.z);
        if self.kernel.radius() == 0 {
            buffer.overwrite(own, value * MAX_DENSITY);
            return;
        }

        let res = self.config.resolution as i32;
        let cell = IVec3::new(sample.x as i32, sample.y as i32, sample.z as i32);
        for tap in self.kernel.taps() {
            let neighbour = cell + tap.offset;
            if neighbour.min_element() < 0 || neighbour.max_element() >= res {
                continue;
            }
            let index = buffer.index(neighbour.x as u32, neighbour.y as u32, neighbour.z as u32);
            buffer.accumulate(index, tap.weight * value * MAX_DENSITY);
        }
    }
}

/// Clamps a sampled density into `[0, 1]`; NaN reads as empty space.
#[inline]
fn sanitize_density(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::grid::SparseVoxelGrid;
    use crate::volume::transform::GridTransform;

    fn cube_grid(edge: i32, value: f32) -> SparseVoxelGrid {
        let mut grid = SparseVoxelGrid::new("density", GridTransform::uniform(1.0), 0.0);
        grid.fill_box(IVec3::ZERO, IVec3::splat(edge - 1), value);
        grid
    }

    #[test]
    fn test_default_config() {
        let config = BakeConfig::default();
        assert_eq!(config.resolution, 128);
        assert_eq!(config.bleed_radius, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_resolution_is_configuration_error() {
        let result = VolumeBaker::new(BakeConfig::new(0, 0));
        assert!(matches!(result, Err(VolumeError::Configuration(_))));
    }

    #[test]
    fn test_oversized_bleed_is_configuration_error() {
        let result = VolumeBaker::new(BakeConfig::new(8, MAX_BLEED_RADIUS + 1));
        assert!(matches!(result, Err(VolumeError::Configuration(_))));
    }

    #[test]
    fn test_radius_two_kernel_keeps_only_center() {
        // R/2 = 1, so every non-zero offset lands at distance >= 1
        let kernel = SplatKernel::new(2);
        assert_eq!(kernel.taps(), &[SplatTap { offset: IVec3::ZERO, weight: 1.0 }]);
    }

    #[test]
    fn test_radius_four_kernel_is_bounded() {
        let kernel = SplatKernel::new(4);
        assert!(kernel.taps().len() > 1);
        for tap in kernel.taps() {
            assert!(tap.offset.min_element() >= -4 && tap.offset.max_element() < 4);
            assert!(tap.weight > 0.0 && tap.weight <= 1.0);
        }
    }

    #[test]
    fn test_lattice_is_cell_centered() {
        let grid = cube_grid(4, 1.0);
        let lattice = Lattice::over_grid(&grid, 2).unwrap();
        assert_eq!(lattice.step, Vec3::splat(2.0));
        assert_eq!(lattice.origin, Vec3::splat(1.0));
        assert_eq!(lattice.sample_point(1, 1, 1), Vec3::splat(3.0));
    }

    #[test]
    fn test_walk_matches_direct_sample_points() {
        let mut grid = SparseVoxelGrid::new("density", GridTransform::from_voxel_size(Vec3::new(0.1, 0.3, 0.7)), 0.0);
        grid.fill_box(IVec3::new(-3, 2, 5), IVec3::new(40, 17, 9), 1.0);
        let lattice = Lattice::over_grid(&grid, 7).unwrap();

        let mut count = 0;
        for sample in lattice.walk() {
            let expected = lattice.sample_point(sample.x, sample.y, sample.z);
            assert!((sample.target - expected).abs().max_element() < 1e-3);
            count += 1;
        }
        assert_eq!(count, 343);
    }

    #[test]
    fn test_walk_size_hint() {
        let grid = cube_grid(3, 1.0);
        let lattice = Lattice::over_grid(&grid, 5).unwrap();
        assert_eq!(lattice.walk().len(), 125);
    }

    #[test]
    fn test_empty_grid_is_degenerate() {
        let grid = SparseVoxelGrid::new("empty", GridTransform::default(), 0.0);
        let baker = VolumeBaker::new(BakeConfig::new(4, 0)).unwrap();
        assert!(matches!(
            baker.bake_grid(&grid),
            Err(VolumeError::DegenerateBounds { .. })
        ));
    }

    #[test]
    fn test_out_of_range_samples_are_clamped() {
        let grid = cube_grid(2, 3.0);
        let baker = VolumeBaker::new(BakeConfig::new(2, 0)).unwrap();
        let buffer = baker.bake_grid(&grid).unwrap();
        assert!(buffer.cells().iter().all(|&v| v == 255.0));
    }

    #[test]
    fn test_negative_samples_read_as_empty() {
        let grid = cube_grid(2, -0.5);
        let baker = VolumeBaker::new(BakeConfig::new(2, 3)).unwrap();
        let buffer = baker.bake_grid(&grid).unwrap();
        assert_eq!(buffer.non_zero_count(), 0);
    }

    #[test]
    fn test_quantize_truncates() {
        assert_eq!(quantize(127.5), 127);
        assert_eq!(quantize(255.0), 255);
        assert_eq!(quantize(-1.0), 0);
    }
}
