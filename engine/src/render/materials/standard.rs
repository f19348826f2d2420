//! Opaque Phong-lit material, drawn with one pass per light.

use std::sync::Arc;

use glam::{Mat4, Vec4};

use super::{Material, ParameterEditor};
use crate::render::device::{RenderDevice, UniformValue};
use crate::render::lighting::{render_light_passes, set_camera_uniforms};
use crate::render::mesh::Mesh;
use crate::render::shader_loader::{Shader, ShaderKind, ShaderLibrary};
use crate::render::state_scope::StateScope;
use crate::render::uniforms::names;
use crate::scene::FrameContext;

pub struct StandardMaterial {
    base_shader: Option<Arc<Shader>>,
    normal_shader: Option<Arc<Shader>>,
    pub color: Vec4,
    /// Swaps the lit shader for the normal visualisation
    pub show_normals: bool,
}

impl StandardMaterial {
    pub fn new(library: &ShaderLibrary, color: Vec4) -> Self {
        Self::with_shaders(library.get(ShaderKind::Lit), library.get(ShaderKind::Normals), color)
    }

    pub fn with_shaders(base: Option<Arc<Shader>>, normals: Option<Arc<Shader>>, color: Vec4) -> Self {
        Self {
            base_shader: base,
            normal_shader: normals,
            color,
            show_normals: false,
        }
    }

    /// Shader drawn with the current debug toggle.
    pub fn active_shader(&self) -> Option<&Arc<Shader>> {
        if self.show_normals {
            self.normal_shader.as_ref()
        } else {
            self.base_shader.as_ref()
        }
    }
}

impl Material for StandardMaterial {
    fn name(&self) -> &str {
        "Standard"
    }

    fn set_uniforms(&self, device: &mut dyn RenderDevice, frame: &FrameContext, model: Mat4) {
        set_camera_uniforms(device, frame, model);
        device.set_uniform(names::COLOR, UniformValue::Vec4(self.color));
    }

    fn render(&self, device: &mut dyn RenderDevice, mesh: Option<&Mesh>, model: Mat4, frame: &FrameContext) {
        let (Some(mesh), Some(shader)) = (mesh, self.active_shader()) else {
            return;
        };

        let mut scope = StateScope::new(device);
        render_light_passes(&mut *scope, shader, mesh, frame, |device| {
            self.set_uniforms(device, frame, model)
        });
    }

    fn render_menu(&mut self, ui: &mut dyn ParameterEditor) {
        ui.checkbox("Show Normals", &mut self.show_normals);

        if !self.show_normals {
            let mut rgb = self.color.truncate();
            if ui.color_edit3("Color", &mut rgb) {
                self.color = rgb.extend(self.color.w);
            }
        }
    }
}
