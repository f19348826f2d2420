//! wgpu Render Device
//!
//! Implements the immediate-mode [`RenderDevice`] on top of wgpu:
//!
//! - every (shader, blend, depth, raster) combination gets a cached pipeline
//! - each draw snapshots the bound shader's [`ShaderUniforms`]; snapshots are
//!   packed into one dynamic-offset uniform buffer when the frame is encoded
//! - meshes upload lazily on first draw, keyed by [`MeshId`]
//! - volume textures are R8Unorm 3D textures sampled with trilinear filtering
//!
//! Draws are recorded during `Scene::render` and replayed in submission order
//! by [`WgpuDevice::encode_frame`] inside a single render pass.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::device::{
    BlendMode, CullMode, DepthFunc, PipelineState, PolygonMode, RasterState, RenderDevice,
    TextureHandle, UniformValue,
};
use super::gpu_context::{GpuContext, DEPTH_FORMAT};
use super::mesh::{Mesh, MeshBuffer, MeshId, Vertex};
use super::shader_loader::{create_shader_module, Shader, ShaderId, ShaderKind, VERTEX_ENTRY};
use super::uniforms::ShaderUniforms;
use crate::error::VolumeError;
use crate::volume::DensityBuffer;

const UNIFORM_SIZE: u64 = std::mem::size_of::<ShaderUniforms>() as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    shader: ShaderId,
    state: PipelineState,
}

struct ShaderEntry {
    kind: ShaderKind,
    module: wgpu::ShaderModule,
}

struct GpuVolumeTexture {
    view: wgpu::TextureView,
    resolution: u32,
}

struct RecordedDraw {
    pipeline: PipelineKey,
    mesh: MeshId,
    uniforms: ShaderUniforms,
    texture: Option<TextureHandle>,
}

pub struct WgpuDevice {
    ctx: GpuContext,
    color_format: wgpu::TextureFormat,
    line_raster: bool,
    warned_line_raster: bool,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    fallback_view: wgpu::TextureView,
    uniform_stride: u64,
    uniform_buffer: Option<(wgpu::Buffer, u64)>,

    shaders: HashMap<ShaderId, ShaderEntry>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    meshes: HashMap<MeshId, MeshBuffer>,
    textures: HashMap<TextureHandle, GpuVolumeTexture>,
    next_texture: u64,

    state: PipelineState,
    bound: Option<ShaderId>,
    uniforms: HashMap<ShaderId, ShaderUniforms>,
    bound_textures: HashMap<ShaderId, TextureHandle>,
    draws: Vec<RecordedDraw>,
}

impl WgpuDevice {
    /// Takes ownership of the context; reach it again through [`WgpuDevice::context`].
    pub fn new(ctx: GpuContext, color_format: wgpu::TextureFormat) -> Self {
        let device = &ctx.device;
        let queue = &ctx.queue;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Smokelab Bind Group Layout"),
            entries: &[
                // Binding 0: per-draw uniforms (dynamic offset)
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                    },
                    count: None,
                },
                // Binding 1: density volume
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                // Binding 2: volume sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Smokelab Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Volume Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // 1³ empty volume bound when a draw has no texture
        let fallback = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Fallback Volume Texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D3,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[0u8],
        );
        let fallback_view = fallback.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Fallback Volume View"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = UNIFORM_SIZE.div_ceil(alignment) * alignment;

        let line_raster = ctx.supports_line_raster();

        Self {
            ctx,
            color_format,
            line_raster,
            warned_line_raster: false,
            bind_group_layout,
            pipeline_layout,
            sampler,
            fallback_view,
            uniform_stride,
            uniform_buffer: None,
            shaders: HashMap::new(),
            pipelines: HashMap::new(),
            meshes: HashMap::new(),
            textures: HashMap::new(),
            next_texture: 1,
            state: PipelineState::default(),
            bound: None,
            uniforms: HashMap::new(),
            bound_textures: HashMap::new(),
            draws: Vec::new(),
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Number of draws recorded since the last `encode_frame`.
    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Replays every recorded draw into one render pass, then clears the list.
    pub fn encode_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        clear_color: wgpu::Color,
    ) {
        let draws = std::mem::take(&mut self.draws);

        if !draws.is_empty() {
            self.upload_uniforms(&draws);
        }

        let mut bind_groups: HashMap<Option<TextureHandle>, wgpu::BindGroup> = HashMap::new();
        if let Some((buffer, _)) = &self.uniform_buffer {
            for draw in &draws {
                let key = draw.texture.filter(|handle| self.textures.contains_key(handle));
                bind_groups
                    .entry(key)
                    .or_insert_with(|| self.create_bind_group(buffer, key));
            }
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Smokelab Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (index, draw) in draws.iter().enumerate() {
            let (Some(pipeline), Some(mesh)) = (self.pipelines.get(&draw.pipeline), self.meshes.get(&draw.mesh))
            else {
                continue;
            };
            let key = draw.texture.filter(|handle| self.textures.contains_key(handle));
            let Some(bind_group) = bind_groups.get(&key) else {
                continue;
            };

            let offset = (index as u64 * self.uniform_stride) as u32;
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, bind_group, &[offset]);
            mesh.draw(&mut render_pass);
        }

        log::debug!(
            "[WgpuDevice] Encoded {} draw(s) with {} pipeline(s)",
            draws.len(),
            self.pipelines.len()
        );
    }

    /// Writes every draw's uniform snapshot at its dynamic offset.
    fn upload_uniforms(&mut self, draws: &[RecordedDraw]) {
        let stride = self.uniform_stride;
        let required = stride * draws.len() as u64;
        if matches!(&self.uniform_buffer, Some((_, capacity)) if *capacity < required) {
            self.uniform_buffer = None;
        }

        let device = &self.ctx.device;
        let (buffer, _) = self.uniform_buffer.get_or_insert_with(|| {
            let capacity = required.next_power_of_two().max(stride * 16);
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Smokelab Uniform Buffer"),
                size: capacity,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            (buffer, capacity)
        });

        let mut staging = vec![0u8; required as usize];
        for (index, draw) in draws.iter().enumerate() {
            let start = index * stride as usize;
            staging[start..start + UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&draw.uniforms));
        }
        self.ctx.queue.write_buffer(buffer, 0, &staging);
    }

    fn create_bind_group(&self, uniform_buffer: &wgpu::Buffer, texture: Option<TextureHandle>) -> wgpu::BindGroup {
        let view = texture
            .and_then(|handle| self.textures.get(&handle))
            .map(|texture| &texture.view)
            .unwrap_or(&self.fallback_view);

        self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Smokelab Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: uniform_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(UNIFORM_SIZE),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let polygon_mode = match key.state.raster.polygon_mode {
            PolygonMode::Fill => wgpu::PolygonMode::Fill,
            PolygonMode::Line if self.line_raster => wgpu::PolygonMode::Line,
            PolygonMode::Line => {
                if !self.warned_line_raster {
                    log::warn!("[WgpuDevice] Line raster unsupported by adapter, drawing wireframes filled");
                    self.warned_line_raster = true;
                }
                wgpu::PolygonMode::Fill
            }
        };

        let Some(entry) = self.shaders.get(&key.shader) else {
            return;
        };

        let label = format!("{} Pipeline", entry.kind.label());
        let pipeline = self.ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &entry.module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[Vertex::buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &entry.module,
                entry_point: Some(entry.kind.fragment_entry()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: Some(blend_state(key.state.blend)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: cull_face(key.state.raster),
                polygon_mode,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: depth_compare(key.state.depth),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!("[WgpuDevice] Created pipeline '{}' for {:?}", label, key.state);
        self.pipelines.insert(key, pipeline);
    }
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Opaque => wgpu::BlendState::REPLACE,
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Additive => {
            let component = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            wgpu::BlendState {
                color: component,
                alpha: component,
            }
        }
    }
}

fn depth_compare(func: DepthFunc) -> wgpu::CompareFunction {
    match func {
        DepthFunc::Less => wgpu::CompareFunction::Less,
        DepthFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        DepthFunc::Always => wgpu::CompareFunction::Always,
    }
}

fn cull_face(raster: RasterState) -> Option<wgpu::Face> {
    match raster.cull_mode {
        CullMode::None => None,
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

impl RenderDevice for WgpuDevice {
    fn bind_shader(&mut self, shader: &Shader) {
        let id = shader.id();
        if !self.shaders.contains_key(&id) {
            let module = create_shader_module(&self.ctx.device, shader.kind().label(), shader.source());
            self.shaders.insert(
                id,
                ShaderEntry {
                    kind: shader.kind(),
                    module,
                },
            );
        }
        self.uniforms.entry(id).or_default();
        self.bound = Some(id);
    }

    fn unbind_shader(&mut self) {
        self.bound = None;
    }

    fn bound_shader(&self) -> Option<ShaderId> {
        self.bound
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let Some(id) = self.bound else {
            log::warn!("[WgpuDevice] set_uniform('{}') with no shader bound", name);
            return;
        };
        let uniforms = self.uniforms.entry(id).or_default();
        if !uniforms.apply(name, value) {
            log::debug!("[WgpuDevice] Ignoring uniform '{}' ({:?})", name, value);
        }
        if let UniformValue::Texture(texture) = value {
            match texture {
                Some(handle) => self.bound_textures.insert(id, handle),
                None => self.bound_textures.remove(&id),
            };
        }
    }

    fn pipeline_state(&self) -> PipelineState {
        self.state
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend = mode;
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.state.depth = func;
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.state.raster = state;
    }

    fn draw_mesh(&mut self, mesh: &Mesh) {
        let Some(shader) = self.bound else {
            log::warn!("[WgpuDevice] Draw of '{}' with no shader bound", mesh.label());
            return;
        };

        if !self.meshes.contains_key(&mesh.id()) {
            let buffer = mesh.upload(&self.ctx.device);
            self.meshes.insert(mesh.id(), buffer);
        }

        let key = PipelineKey {
            shader,
            state: self.state,
        };
        self.ensure_pipeline(key);

        self.draws.push(RecordedDraw {
            pipeline: key,
            mesh: mesh.id(),
            uniforms: self.uniforms.get(&shader).copied().unwrap_or_default(),
            texture: self.bound_textures.get(&shader).copied(),
        });
    }

    fn create_volume_texture(&mut self, buffer: &DensityBuffer) -> Result<TextureHandle, VolumeError> {
        let resolution = buffer.resolution();
        if resolution == 0 {
            return Err(VolumeError::Configuration("volume texture resolution is zero".into()));
        }
        let max_dimension = self.ctx.device.limits().max_texture_dimension_3d;
        if resolution > max_dimension {
            return Err(VolumeError::ResourceExhaustion(format!(
                "{resolution}³ volume texture exceeds the device limit of {max_dimension}"
            )));
        }

        let texels = buffer.to_texels();
        let size = wgpu::Extent3d {
            width: resolution,
            height: resolution,
            depth_or_array_layers: resolution,
        };

        self.ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Volume Density Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(self.ctx.device.pop_error_scope()) {
            return Err(VolumeError::ResourceExhaustion(format!(
                "allocating {resolution}³ volume texture: {err}"
            )));
        }

        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(resolution),
                rows_per_image: Some(resolution),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Volume Density View"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(handle, GpuVolumeTexture { view, resolution });

        log::info!(
            "[WgpuDevice] Uploaded {}³ volume texture ({} bytes)",
            resolution,
            texels.len()
        );
        Ok(handle)
    }

    fn release_volume_texture(&mut self, handle: TextureHandle) {
        match self.textures.remove(&handle) {
            Some(texture) => log::debug!(
                "[WgpuDevice] Released {}³ volume texture {:?}",
                texture.resolution,
                handle
            ),
            None => log::warn!("[WgpuDevice] Release of unknown texture {:?}", handle),
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
    }
}
