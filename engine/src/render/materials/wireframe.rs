//! Wireframe material: a flat colour drawn as lines.

use glam::{Mat4, Vec4};

use super::{FlatMaterial, Material, ParameterEditor};
use crate::render::device::{RasterState, RenderDevice};
use crate::render::mesh::Mesh;
use crate::render::shader_loader::ShaderLibrary;
use crate::render::state_scope::StateScope;
use crate::scene::FrameContext;

/// Flat colour with line raster and culling off for its own draw only.
pub struct WireframeMaterial {
    flat: FlatMaterial,
}

impl WireframeMaterial {
    pub fn new(library: &ShaderLibrary, color: Vec4) -> Self {
        Self {
            flat: FlatMaterial::new(library, color),
        }
    }

    pub fn from_flat(flat: FlatMaterial) -> Self {
        Self { flat }
    }

    pub fn color(&self) -> Vec4 {
        self.flat.color
    }
}

impl Material for WireframeMaterial {
    fn name(&self) -> &str {
        "Wireframe"
    }

    fn set_uniforms(&self, device: &mut dyn RenderDevice, frame: &FrameContext, model: Mat4) {
        self.flat.set_uniforms(device, frame, model);
    }

    fn render(&self, device: &mut dyn RenderDevice, mesh: Option<&Mesh>, model: Mat4, frame: &FrameContext) {
        if mesh.is_none() || self.flat.shader().is_none() {
            return;
        }

        let mut scope = StateScope::new(device);
        scope.set_raster_state(RasterState::WIREFRAME);
        self.flat.render(&mut *scope, mesh, model, frame);
    }

    fn render_menu(&mut self, ui: &mut dyn ParameterEditor) {
        self.flat.render_menu(ui);
    }
}
