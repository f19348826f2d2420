//! Grid Transform
//!
//! Linear mapping between a sparse grid's index space and world space.
//! Sparse grids store voxels on an integer lattice; the transform carries the
//! voxel size (and optionally an orientation) that places that lattice in the
//! world. Only the linear part is modelled: every conversion here operates on
//! displacements, never on positions with a translation.

use glam::{Mat3, Vec3};

use crate::error::DecodeError;

/// Determinants below this are treated as singular.
const MIN_DETERMINANT: f32 = 1e-12;

/// Index ↔ world linear map of a sparse grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridTransform {
    index_to_world: Mat3,
    world_to_index: Mat3,
}

impl GridTransform {
    /// Axis-aligned transform with the same voxel size on every axis.
    pub fn uniform(voxel_size: f32) -> Self {
        Self::from_voxel_size(Vec3::splat(voxel_size))
    }

    /// Axis-aligned transform with a per-axis voxel size.
    ///
    /// Non-positive sizes are not rejected here; use [`GridTransform::from_matrix`]
    /// when the input comes from outside the crate.
    pub fn from_voxel_size(voxel_size: Vec3) -> Self {
        let index_to_world = Mat3::from_diagonal(voxel_size);
        Self {
            index_to_world,
            world_to_index: Mat3::from_diagonal(voxel_size.recip()),
        }
    }

    /// General linear transform (columns are the world-space images of the
    /// index axes). Fails for singular matrices.
    pub fn from_matrix(grid: &str, index_to_world: Mat3) -> Result<Self, DecodeError> {
        let det = index_to_world.determinant();
        if !det.is_finite() || det.abs() < MIN_DETERMINANT {
            return Err(DecodeError::InvalidGrid {
                grid: grid.to_string(),
                reason: format!("transform is singular (determinant {det})"),
            });
        }
        Ok(Self {
            index_to_world,
            world_to_index: index_to_world.inverse(),
        })
    }

    /// Maps a world-space displacement into index space.
    ///
    /// This is the inverse map the baker uses to turn its uniform world step
    /// into the (possibly anisotropic) index step the grid is sampled with.
    #[inline]
    pub fn to_index_vector(&self, world: Vec3) -> Vec3 {
        self.world_to_index * world
    }

    /// Maps an index-space displacement into world space.
    #[inline]
    pub fn to_world_vector(&self, index: Vec3) -> Vec3 {
        self.index_to_world * index
    }

    pub fn index_to_world(&self) -> Mat3 {
        self.index_to_world
    }

    pub fn world_to_index(&self) -> Mat3 {
        self.world_to_index
    }
}

impl Default for GridTransform {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}
