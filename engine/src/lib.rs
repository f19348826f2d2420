//! Smokelab Engine Library
//!
//! Bakes sparse voxel density grids into dense 3D textures and renders them
//! as participating media, next to ordinary lit and wireframe geometry.
//!
//! # Modules
//!
//! - [`volume`] - Sparse grids, grid decoding and the density baker
//! - [`render`] - Device abstraction, materials, multi-light passes, wgpu back-end
//! - [`scene`] - Camera, lights and the node list a frame is drawn from
//! - [`config`] - JSON engine configuration
//! - [`error`] - Error types shared by every module
//!
//! # Example
//!
//! ```ignore
//! use smokelab_engine::render::{HeadlessDevice, ShaderLibrary, VolumeMaterial};
//! use smokelab_engine::volume::{JsonGridDecoder, VolumeBaker};
//!
//! let library = ShaderLibrary::embedded();
//! let mut device = HeadlessDevice::new();
//! let baker = VolumeBaker::new(Default::default())?;
//!
//! let mut material = VolumeMaterial::new(&library, Default::default());
//! material.load_volume(&mut device, &JsonGridDecoder::new(), &baker, "smoke.json")?;
//! ```

pub mod config;
pub mod error;
pub mod render;
pub mod scene;
pub mod volume;

pub use config::EngineConfig;
pub use error::{ConfigError, DecodeError, GpuError, VolumeError};
pub use scene::{Camera, FrameContext, Light, Scene, SceneNode, SceneSettings};
