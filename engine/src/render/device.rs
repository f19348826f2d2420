//! Render Device Abstraction
//!
//! `RenderDevice` is the immediate-mode seam materials draw through: bind a
//! shader, set named uniforms, change blend/depth/raster state, draw a mesh.
//! Two back-ends implement it: [`HeadlessDevice`](super::headless::HeadlessDevice)
//! records every call, [`WgpuDevice`](super::wgpu_device::WgpuDevice) turns the
//! calls into cached pipelines and a replayable draw list.

use glam::{Mat4, Vec3, Vec4};

use super::mesh::Mesh;
use super::shader_loader::{Shader, ShaderId};
use crate::error::VolumeError;
use crate::volume::DensityBuffer;

/// Colour blending applied to fragment output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Output replaces the target
    #[default]
    Opaque,
    /// `src * srcAlpha + dst * (1 - srcAlpha)`
    Alpha,
    /// `src * srcAlpha + dst`, used to accumulate light passes
    Additive,
}

/// Depth comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthFunc {
    #[default]
    Less,
    LessEqual,
    Always,
}

/// Triangle rasterisation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

/// Face culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
}

/// Rasteriser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RasterState {
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
}

impl RasterState {
    /// Line raster with culling disabled.
    pub const WIREFRAME: Self = Self {
        polygon_mode: PolygonMode::Line,
        cull_mode: CullMode::None,
    };
}

/// Every piece of fixed-function state a draw depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PipelineState {
    pub blend: BlendMode,
    pub depth: DepthFunc,
    pub raster: RasterState,
}

/// Opaque handle of a device-owned 3D texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Value of a named shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    /// `None` unbinds the shader's texture.
    Texture(Option<TextureHandle>),
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        UniformValue::Vec4(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        UniformValue::Mat4(value)
    }
}

impl From<TextureHandle> for UniformValue {
    fn from(value: TextureHandle) -> Self {
        UniformValue::Texture(Some(value))
    }
}

/// Immediate-mode rendering device.
///
/// At most one shader is bound at a time. Uniform values are kept per shader
/// and persist across bind/unbind, so a shader can be re-bound without
/// re-uploading every value.
pub trait RenderDevice {
    /// Binds a shader, replacing any bound one.
    fn bind_shader(&mut self, shader: &Shader);

    fn unbind_shader(&mut self);

    fn bound_shader(&self) -> Option<ShaderId>;

    /// Sets a uniform on the bound shader. Ignored when nothing is bound.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn pipeline_state(&self) -> PipelineState;

    fn set_blend_mode(&mut self, mode: BlendMode);

    fn set_depth_func(&mut self, func: DepthFunc);

    fn set_raster_state(&mut self, state: RasterState);

    /// Draws the whole mesh with the bound shader and current state.
    fn draw_mesh(&mut self, mesh: &Mesh);

    /// Allocates a cubic single-channel 8-bit 3D texture holding `buffer`.
    fn create_volume_texture(&mut self, buffer: &DensityBuffer) -> Result<TextureHandle, VolumeError>;

    fn release_volume_texture(&mut self, handle: TextureHandle);

    fn blend_mode(&self) -> BlendMode {
        self.pipeline_state().blend
    }

    fn depth_func(&self) -> DepthFunc {
        self.pipeline_state().depth
    }

    fn raster_state(&self) -> RasterState {
        self.pipeline_state().raster
    }

    /// Sets every piece of fixed-function state at once.
    fn set_pipeline_state(&mut self, state: PipelineState) {
        self.set_blend_mode(state.blend);
        self.set_depth_func(state.depth);
        self.set_raster_state(state.raster);
    }
}
