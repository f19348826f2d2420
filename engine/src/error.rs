//! Error types for the volume pipeline and its GPU back-ends.

use glam::Vec3;
use thiserror::Error;

/// Failure of a `load_volume` call (or of any step it is made of).
///
/// Every variant aborts only the load in progress; the volume that was
/// renderable before the call stays bound.
#[derive(Error, Debug)]
pub enum VolumeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Degenerate bounds: world box {min} .. {max} has zero extent on at least one axis")]
    DegenerateBounds { min: Vec3, max: Vec3 },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Resource exhaustion: {0}")]
    ResourceExhaustion(String),

    #[error("Grid container holds no grids")]
    NoGrids,
}

/// Failure while decoding a sparse grid container.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed grid container: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported grid type '{grid_type}' in grid '{grid}'")]
    UnsupportedGridType { grid: String, grid_type: String },

    #[error("Invalid grid '{grid}': {reason}")]
    InvalidGrid { grid: String, reason: String },
}

/// Failure while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] VolumeError),
}

/// Failure while bringing up or reading back from the GPU.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("Failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("Readback failed: {0}")]
    Readback(String),
}

pub type Result<T> = std::result::Result<T, VolumeError>;
