//! Scene Module
//!
//! Camera, lights and the per-frame context materials read while rendering.
//! Nothing here is global: a [`Scene`] builds a [`FrameContext`] each frame
//! and hands it to every node's material.

use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::render::device::{RenderDevice, UniformValue};
use crate::render::materials::{Material, ParameterEditor};
use crate::render::mesh::Mesh;
use crate::render::uniforms::names;

/// Perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 1.0, 4.0),
            center: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn look_at(eye: Vec3, center: Vec3, up: Vec3) -> Self {
        Self {
            eye,
            center,
            up,
            ..Default::default()
        }
    }

    pub fn with_perspective(mut self, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.center, self.up)
    }

    /// Right-handed projection with a `[0, 1]` depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Point light shading one pass of a multi-pass material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec4,
    pub intensity: f32,
    pub shininess: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 0.0),
            color: Vec4::ONE,
            intensity: 1.0,
            shininess: 30.0,
        }
    }
}

impl Light {
    pub fn new(position: Vec3, color: Vec4) -> Self {
        Self {
            position,
            color,
            ..Default::default()
        }
    }

    /// Set position and return self for chaining.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set color and return self for chaining.
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Set intensity and return self for chaining.
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Set shininess and return self for chaining.
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    /// Uploads this light's uniforms to the bound shader.
    pub fn set_uniforms(&self, device: &mut dyn RenderDevice) {
        device.set_uniform(names::LIGHT_COLOR, UniformValue::Vec4(self.color));
        device.set_uniform(names::LIGHT_INTENSITY, UniformValue::Float(self.intensity));
        device.set_uniform(names::LIGHT_SHININESS, UniformValue::Float(self.shininess));
        device.set_uniform(names::LIGHT_POSITION, UniformValue::Vec3(self.position));
    }
}

/// Per-scene lighting and volume settings, loadable from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Ambient term; alpha 1 marks the base pass
    pub ambient_light: Vec4,
    pub background_color: Vec4,
    /// Volume bounds in model space
    pub box_min: Vec3,
    pub box_max: Vec3,
    pub lights: Vec<Light>,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            ambient_light: Vec4::new(0.1, 0.1, 0.1, 1.0),
            background_color: Vec4::new(0.1, 0.1, 0.12, 1.0),
            box_min: Vec3::splat(-1.0),
            box_max: Vec3::splat(1.0),
            lights: Vec::new(),
        }
    }
}

/// Everything a material reads while rendering one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub camera: &'a Camera,
    pub lights: &'a [Light],
    pub ambient_light: Vec4,
    pub background_color: Vec4,
    pub box_min: Vec3,
    pub box_max: Vec3,
}

impl<'a> FrameContext<'a> {
    pub fn new(camera: &'a Camera, lights: &'a [Light], settings: &SceneSettings) -> Self {
        Self {
            camera,
            lights,
            ambient_light: settings.ambient_light,
            background_color: settings.background_color,
            box_min: settings.box_min,
            box_max: settings.box_max,
        }
    }
}

/// A drawable: mesh, transform and the material that renders it.
pub struct SceneNode {
    pub name: String,
    pub mesh: Option<Arc<Mesh>>,
    pub model: Mat4,
    pub material: Box<dyn Material>,
    pub visible: bool,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, mesh: Arc<Mesh>, material: Box<dyn Material>) -> Self {
        Self {
            name: name.into(),
            mesh: Some(mesh),
            model: Mat4::IDENTITY,
            material,
            visible: true,
        }
    }

    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }

    pub fn render(&self, device: &mut dyn RenderDevice, frame: &FrameContext) {
        if self.visible {
            self.material.render(device, self.mesh.as_deref(), self.model, frame);
        }
    }
}

/// Flat list of nodes rendered in insertion order.
pub struct Scene {
    pub camera: Camera,
    pub settings: SceneSettings,
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new(camera: Camera, settings: SceneSettings) -> Self {
        Self {
            camera,
            settings,
            nodes: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: SceneNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|node| node.name == name)
    }

    pub fn frame(&self) -> FrameContext<'_> {
        FrameContext::new(&self.camera, &self.settings.lights, &self.settings)
    }

    pub fn render(&self, device: &mut dyn RenderDevice) {
        let frame = self.frame();
        for node in &self.nodes {
            node.render(device, &frame);
        }
    }

    /// Shows every node's material parameters.
    pub fn render_menu(&mut self, ui: &mut dyn ParameterEditor) {
        for node in &mut self.nodes {
            node.material.render_menu(ui);
        }
    }
}
