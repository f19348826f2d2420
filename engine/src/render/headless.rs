//! Headless Render Device
//!
//! A [`RenderDevice`] with no GPU behind it. Every call is appended to a
//! command log and every draw captures the state and uniform block it would
//! have been issued with, which makes pass structure, state transitions and
//! texture lifetimes observable from tests and CPU-only tools.

use std::collections::{BTreeMap, HashMap};

use super::device::{
    BlendMode, DepthFunc, PipelineState, RasterState, RenderDevice, TextureHandle, UniformValue,
};
use super::mesh::{Mesh, MeshId};
use super::shader_loader::{Shader, ShaderId, ShaderKind};
use super::uniforms::ShaderUniforms;
use crate::error::VolumeError;
use crate::volume::DensityBuffer;

/// wgpu's default `max_texture_dimension_3d`.
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 2048;

/// One recorded draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub shader: ShaderKind,
    pub shader_id: ShaderId,
    pub mesh: MeshId,
    pub index_count: u32,
    pub state: PipelineState,
    pub uniforms: ShaderUniforms,
    pub texture: Option<TextureHandle>,
}

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    BindShader(ShaderKind),
    UnbindShader,
    SetUniform { name: String, value: UniformValue },
    SetBlendMode(BlendMode),
    SetDepthFunc(DepthFunc),
    SetRasterState(RasterState),
    Draw(DrawCall),
    CreateTexture { handle: TextureHandle, resolution: u32 },
    ReleaseTexture(TextureHandle),
}

#[derive(Debug, Clone)]
struct HeadlessTexture {
    resolution: u32,
    texels: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct BoundShader {
    id: ShaderId,
    kind: ShaderKind,
}

/// Recording render device.
#[derive(Debug)]
pub struct HeadlessDevice {
    commands: Vec<DeviceCommand>,
    state: PipelineState,
    bound: Option<BoundShader>,
    uniforms: HashMap<ShaderId, ShaderUniforms>,
    bound_textures: HashMap<ShaderId, TextureHandle>,
    textures: BTreeMap<TextureHandle, HeadlessTexture>,
    next_texture: u64,
    max_texture_dimension: u32,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            state: PipelineState::default(),
            bound: None,
            uniforms: HashMap::new(),
            bound_textures: HashMap::new(),
            textures: BTreeMap::new(),
            next_texture: 1,
            max_texture_dimension: DEFAULT_MAX_TEXTURE_DIMENSION,
        }
    }

    /// Caps texture edge length; larger allocations fail with `ResourceExhaustion`.
    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.max_texture_dimension = max;
        self
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draws(&self) -> Vec<&DrawCall> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::Draw(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn is_live(&self, handle: TextureHandle) -> bool {
        self.textures.contains_key(&handle)
    }

    pub fn texture_resolution(&self, handle: TextureHandle) -> Option<u32> {
        self.textures.get(&handle).map(|texture| texture.resolution)
    }

    /// Uploaded texel data of a live texture.
    pub fn texture_texels(&self, handle: TextureHandle) -> Option<&[u8]> {
        self.textures.get(&handle).map(|texture| texture.texels.as_slice())
    }
}

impl RenderDevice for HeadlessDevice {
    fn bind_shader(&mut self, shader: &Shader) {
        self.bound = Some(BoundShader {
            id: shader.id(),
            kind: shader.kind(),
        });
        self.uniforms.entry(shader.id()).or_default();
        self.commands.push(DeviceCommand::BindShader(shader.kind()));
    }

    fn unbind_shader(&mut self) {
        self.bound = None;
        self.commands.push(DeviceCommand::UnbindShader);
    }

    fn bound_shader(&self) -> Option<ShaderId> {
        self.bound.map(|bound| bound.id)
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(bound) = self.bound else {
            log::warn!("[HeadlessDevice] set_uniform('{}') with no shader bound", name);
            return;
        };

        let uniforms = self.uniforms.entry(bound.id).or_default();
        if !uniforms.apply(name, value) {
            log::debug!("[HeadlessDevice] Ignoring uniform '{}' ({:?})", name, value);
        }
        if let UniformValue::Texture(texture) = value {
            match texture {
                Some(handle) => self.bound_textures.insert(bound.id, handle),
                None => self.bound_textures.remove(&bound.id),
            };
        }
        self.commands.push(DeviceCommand::SetUniform {
            name: name.to_string(),
            value,
        });
    }

    fn pipeline_state(&self) -> PipelineState {
        self.state
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend = mode;
        self.commands.push(DeviceCommand::SetBlendMode(mode));
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.state.depth = func;
        self.commands.push(DeviceCommand::SetDepthFunc(func));
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.state.raster = state;
        self.commands.push(DeviceCommand::SetRasterState(state));
    }

    fn draw_mesh(&mut self, mesh: &Mesh) {
        let Some(bound) = self.bound else {
            log::warn!("[HeadlessDevice] Draw of '{}' with no shader bound", mesh.label());
            return;
        };

        let draw = DrawCall {
            shader: bound.kind,
            shader_id: bound.id,
            mesh: mesh.id(),
            index_count: mesh.index_count(),
            state: self.state,
            uniforms: self.uniforms.get(&bound.id).copied().unwrap_or_default(),
            texture: self.bound_textures.get(&bound.id).copied(),
        };
        self.commands.push(DeviceCommand::Draw(draw));
    }

    fn create_volume_texture(&mut self, buffer: &DensityBuffer) -> Result<TextureHandle, VolumeError> {
        let resolution = buffer.resolution();
        if resolution == 0 {
            return Err(VolumeError::Configuration("volume texture resolution is zero".into()));
        }
        if resolution > self.max_texture_dimension {
            return Err(VolumeError::ResourceExhaustion(format!(
                "{resolution}³ volume texture exceeds the device limit of {}",
                self.max_texture_dimension
            )));
        }

        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            handle,
            HeadlessTexture {
                resolution,
                texels: buffer.to_texels(),
            },
        );
        self.commands.push(DeviceCommand::CreateTexture { handle, resolution });
        Ok(handle)
    }

    fn release_volume_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle).is_none() {
            log::warn!("[HeadlessDevice] Release of unknown texture {:?}", handle);
        }
        let uniforms = &mut self.uniforms;
        self.bound_textures.retain(|shader, bound| {
            let keep = *bound != handle;
            if !keep {
                if let Some(block) = uniforms.get_mut(shader) {
                    block.has_texture = 0;
                }
            }
            keep
        });
        self.commands.push(DeviceCommand::ReleaseTexture(handle));
    }
}
