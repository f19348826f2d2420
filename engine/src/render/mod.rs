//! Render Module
//!
//! Immediate-mode device abstraction, the materials drawn through it, and
//! two back-ends: a wgpu renderer for real frames and a headless recorder
//! for tests.

pub mod device;
pub mod gpu_context;
pub mod headless;
pub mod lighting;
pub mod materials;
pub mod mesh;
pub mod shader_loader;
pub mod state_scope;
pub mod uniforms;
pub mod volume_texture;
pub mod wgpu_device;

pub use device::{
    BlendMode, CullMode, DepthFunc, PipelineState, PolygonMode, RasterState, RenderDevice, TextureHandle,
    UniformValue,
};
pub use gpu_context::{GpuContext, GpuContextConfig, OffscreenTarget, COLOR_FORMAT, DEPTH_FORMAT};
pub use headless::{DeviceCommand, DrawCall, HeadlessDevice, DEFAULT_MAX_TEXTURE_DIMENSION};
pub use lighting::{pass_count, render_light_passes};
pub use materials::{
    DensitySource, FlatMaterial, Material, MenuRecorder, ParameterEditor, StandardMaterial, VolumeMaterial,
    VolumeParams, VolumeShading, WireframeMaterial,
};
pub use mesh::{Mesh, MeshId, Vertex};
pub use shader_loader::{Shader, ShaderId, ShaderKind, ShaderLibrary, ShaderSource};
pub use state_scope::StateScope;
pub use uniforms::ShaderUniforms;
pub use volume_texture::{VolumeSlot, VolumeTexture};
pub use wgpu_device::WgpuDevice;
