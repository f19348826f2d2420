//! CPU meshes and their GPU buffers.
//!
//! Meshes are indexed triangle lists. Each mesh gets a process-unique
//! [`MeshId`] so a device can upload it once and reuse the buffers.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use wgpu::util::DeviceExt;

/// Vertex layout shared by every shader (position, normal, uv).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

static_assertions::const_assert_eq!(std::mem::size_of::<Vertex>(), 32);

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 12,
            shader_location: 1,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 24,
            shader_location: 2,
        },
    ];

    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }

    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Indexed triangle mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    id: MeshId,
    label: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    pub fn new(label: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            label: label.into(),
            vertices,
            indices,
        }
    }

    /// Axis-aligned cube centred on the origin, 24 vertices with face normals.
    pub fn cube(half_extent: f32) -> Self {
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::Z),
            (Vec3::Y, Vec3::NEG_Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::Z, Vec3::X),
            (Vec3::Z, Vec3::Y, Vec3::X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::NEG_X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, right) in faces {
            let base = vertices.len() as u32;
            let center = normal * half_extent;
            let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
            for (u, v) in corners {
                let position = center + (right * u + up * v) * half_extent;
                vertices.push(Vertex::new(position, normal, [(u + 1.0) * 0.5, (v + 1.0) * 0.5]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new("Cube", vertices, indices)
    }

    /// Square in the XZ plane facing +Y, centred on the origin.
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        let vertices = vec![
            Vertex::new(Vec3::new(-h, 0.0, h), Vec3::Y, [0.0, 0.0]),
            Vertex::new(Vec3::new(h, 0.0, h), Vec3::Y, [1.0, 0.0]),
            Vertex::new(Vec3::new(h, 0.0, -h), Vec3::Y, [1.0, 1.0]),
            Vertex::new(Vec3::new(-h, 0.0, -h), Vec3::Y, [0.0, 1.0]),
        ];
        Self::new("Plane", vertices, vec![0, 1, 2, 0, 2, 3])
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Uploads vertex and index data.
    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", self.label)),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.label)),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.index_count(),
        }
    }
}

/// GPU buffers of an uploaded mesh
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffer {
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count > 0 {
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.index_count, 0, 0..1);
        }
    }
}
