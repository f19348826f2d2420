//! Volume Module
//!
//! CPU side of the volumetric pipeline: sparse grid storage and decoding,
//! world-box resolution, and baking into dense 8-bit density buffers.

pub mod baker;
pub mod bounds;
pub mod decoder;
pub mod grid;
pub mod transform;

pub use baker::{
    BakeConfig, DensityBuffer, Lattice, LatticeSample, LatticeWalk, SplatKernel, SplatTap,
    VolumeBaker, DEFAULT_BAKE_RESOLUTION, DEFAULT_BLEED_RADIUS, MAX_BAKE_RESOLUTION,
    MAX_BLEED_RADIUS,
};
pub use bounds::{resolve_world_box, WorldBox};
pub use decoder::{GridDecoder, JsonGridDecoder};
pub use grid::{SparseGrid, SparseVoxelGrid};
pub use transform::GridTransform;
