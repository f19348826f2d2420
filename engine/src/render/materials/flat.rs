//! Unlit solid-colour material.

use std::sync::Arc;

use glam::{Mat4, Vec4};

use super::{Material, ParameterEditor};
use crate::render::device::{DepthFunc, RenderDevice, UniformValue};
use crate::render::lighting::set_camera_uniforms;
use crate::render::mesh::Mesh;
use crate::render::shader_loader::{Shader, ShaderKind, ShaderLibrary};
use crate::render::state_scope::StateScope;
use crate::render::uniforms::names;
use crate::scene::FrameContext;

pub struct FlatMaterial {
    shader: Option<Arc<Shader>>,
    pub color: Vec4,
}

impl FlatMaterial {
    pub fn new(library: &ShaderLibrary, color: Vec4) -> Self {
        Self::with_shader(library.get(ShaderKind::Flat), color)
    }

    pub fn with_shader(shader: Option<Arc<Shader>>, color: Vec4) -> Self {
        Self { shader, color }
    }

    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.shader.as_ref()
    }
}

impl Material for FlatMaterial {
    fn name(&self) -> &str {
        "Flat"
    }

    fn set_uniforms(&self, device: &mut dyn RenderDevice, frame: &FrameContext, model: Mat4) {
        set_camera_uniforms(device, frame, model);
        device.set_uniform(names::COLOR, UniformValue::Vec4(self.color));
    }

    fn render(&self, device: &mut dyn RenderDevice, mesh: Option<&Mesh>, model: Mat4, frame: &FrameContext) {
        let (Some(mesh), Some(shader)) = (mesh, self.shader.as_deref()) else {
            return;
        };

        let mut scope = StateScope::new(device);
        scope.set_depth_func(DepthFunc::Less);
        scope.bind_shader(shader);
        self.set_uniforms(&mut *scope, frame, model);
        scope.draw_mesh(mesh);
        scope.unbind_shader();
    }

    fn render_menu(&mut self, ui: &mut dyn ParameterEditor) {
        let mut rgb = self.color.truncate();
        if ui.color_edit3("Color", &mut rgb) {
            self.color = rgb.extend(self.color.w);
        }
    }
}
