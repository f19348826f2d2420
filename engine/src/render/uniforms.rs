//! Shader Uniforms
//!
//! Named uniforms set through [`RenderDevice::set_uniform`](super::device::RenderDevice::set_uniform)
//! and the packed GPU block they land in. The WGSL side declares the same
//! block in `shaders/common.wgsl`; the layout must match it exactly.

use glam::{Mat4, Vec3, Vec4};
use static_assertions::const_assert_eq;

use super::device::UniformValue;

/// Uniform wire names.
pub mod names {
    pub const VIEW_PROJECTION: &str = "u_viewprojection";
    /// World-space camera position
    pub const CAMERA_POSITION: &str = "u_camera_position";
    /// Camera position in the model's local space (volumes)
    pub const LOCAL_CAMERA_POSITION: &str = "u_cameraPosition";
    pub const MODEL: &str = "u_model";
    pub const VIEW: &str = "u_view";
    pub const COLOR: &str = "u_color";
    pub const TEXTURE: &str = "u_texture";

    pub const AMBIENT_LIGHT: &str = "u_ambient_light";
    pub const LIGHT_INTENSITY: &str = "u_light_intensity";
    pub const LIGHT_SHININESS: &str = "u_light_shininess";
    pub const LIGHT_COLOR: &str = "u_light_color";
    pub const LIGHT_POSITION: &str = "u_light_position";

    pub const ABSORPTION_COEFFICIENT: &str = "u_absorptionCoefficient";
    pub const BACKGROUND_COLOR: &str = "u_backgroundColor";
    pub const BOX_MIN: &str = "u_boxMin";
    pub const BOX_MAX: &str = "u_boxMax";
    pub const MAX_DISTANCE: &str = "u_maxDistance";
    pub const NUM_STEPS: &str = "u_numSteps";
    pub const NOISE_SCALE: &str = "u_noise_scale";
    pub const NOISE_DETAIL: &str = "u_noise_detail";
    pub const EMISSION_COLOR: &str = "u_emissionColor";
    pub const EMISSION_INTENSITY: &str = "u_emissionIntensity";
    pub const DENSITY_SOURCE: &str = "u_densitySource";
    pub const DENSITY_SCALE: &str = "u_densityScale";
}

/// Packed uniform block shared by every shader.
///
/// WGSL uniform layout (384 bytes):
///   offset   0: view_projection (mat4x4<f32>)
///   offset  64: model (mat4x4<f32>)
///   offset 128: view (mat4x4<f32>)
///   offset 192: color (vec4<f32>)
///   offset 208: ambient_light (vec4<f32>)
///   offset 224: light_color (vec4<f32>)
///   offset 240: background_color (vec4<f32>)
///   offset 256: camera_position (vec3<f32>) + light_intensity (f32)
///   offset 272: local_camera_position (vec3<f32>) + light_shininess (f32)
///   offset 288: light_position (vec3<f32>) + absorption (f32)
///   offset 304: box_min (vec3<f32>) + max_distance (f32)
///   offset 320: box_max (vec3<f32>) + num_steps (f32)
///   offset 336: emission_color (vec3<f32>) + emission_intensity (f32)
///   offset 352: noise_scale, noise_detail, density_scale (f32), density_source (u32)
///   offset 368: has_texture (u32) + 12 bytes padding
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShaderUniforms {
    pub view_projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub ambient_light: [f32; 4],
    pub light_color: [f32; 4],
    pub background_color: [f32; 4],
    pub camera_position: [f32; 3],
    pub light_intensity: f32,
    pub local_camera_position: [f32; 3],
    pub light_shininess: f32,
    pub light_position: [f32; 3],
    pub absorption: f32,
    pub box_min: [f32; 3],
    pub max_distance: f32,
    pub box_max: [f32; 3],
    /// Ray-march step length
    pub num_steps: f32,
    pub emission_color: [f32; 3],
    pub emission_intensity: f32,
    pub noise_scale: f32,
    pub noise_detail: f32,
    pub density_scale: f32,
    /// 0 = VDB texture, 1 = noise, 2 = constant
    pub density_source: u32,
    /// 1 when a volume texture is bound to `u_texture`
    pub has_texture: u32,
    pub _pad: [u32; 3],
}

const_assert_eq!(std::mem::size_of::<ShaderUniforms>(), 384);

impl Default for ShaderUniforms {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view_projection: identity,
            model: identity,
            view: identity,
            color: [1.0; 4],
            ambient_light: [0.0; 4],
            light_color: [0.0; 4],
            background_color: [0.0; 4],
            camera_position: [0.0; 3],
            light_intensity: 1.0,
            local_camera_position: [0.0; 3],
            light_shininess: 1.0,
            light_position: [0.0; 3],
            absorption: 1.0,
            box_min: [-1.0; 3],
            max_distance: 100.0,
            box_max: [1.0; 3],
            num_steps: 0.05,
            emission_color: [0.0; 3],
            emission_intensity: 0.0,
            noise_scale: 1.0,
            noise_detail: 1.0,
            density_scale: 1.0,
            density_source: 0,
            has_texture: 0,
            _pad: [0; 3],
        }
    }
}

impl ShaderUniforms {
    /// Writes a named uniform into the block.
    ///
    /// Returns `false` for unknown names and for values whose type does not
    /// match the uniform; the block is left unchanged in that case.
    pub fn apply(&mut self, name: &str, value: UniformValue) -> bool {
        use UniformValue as U;

        match (name, value) {
            (names::VIEW_PROJECTION, U::Mat4(m)) => self.view_projection = m.to_cols_array_2d(),
            (names::MODEL, U::Mat4(m)) => self.model = m.to_cols_array_2d(),
            (names::VIEW, U::Mat4(m)) => self.view = m.to_cols_array_2d(),

            (names::COLOR, U::Vec4(v)) => self.color = v.to_array(),
            (names::AMBIENT_LIGHT, U::Vec4(v)) => self.ambient_light = v.to_array(),
            (names::AMBIENT_LIGHT, U::Vec3(v)) => self.ambient_light = v.extend(1.0).to_array(),
            (names::LIGHT_COLOR, U::Vec4(v)) => self.light_color = v.to_array(),
            (names::LIGHT_COLOR, U::Vec3(v)) => self.light_color = v.extend(1.0).to_array(),
            (names::BACKGROUND_COLOR, U::Vec4(v)) => self.background_color = v.to_array(),
            (names::BACKGROUND_COLOR, U::Vec3(v)) => self.background_color = v.extend(1.0).to_array(),

            (names::CAMERA_POSITION, U::Vec3(v)) => self.camera_position = v.to_array(),
            (names::LOCAL_CAMERA_POSITION, U::Vec3(v)) => self.local_camera_position = v.to_array(),
            (names::LIGHT_POSITION, U::Vec3(v)) => self.light_position = v.to_array(),
            (names::BOX_MIN, U::Vec3(v)) => self.box_min = v.to_array(),
            (names::BOX_MAX, U::Vec3(v)) => self.box_max = v.to_array(),
            (names::EMISSION_COLOR, U::Vec3(v)) => self.emission_color = v.to_array(),
            (names::EMISSION_COLOR, U::Vec4(v)) => self.emission_color = v.truncate().to_array(),

            (names::LIGHT_INTENSITY, U::Float(f)) => self.light_intensity = f,
            (names::LIGHT_SHININESS, U::Float(f)) => self.light_shininess = f,
            (names::ABSORPTION_COEFFICIENT, U::Float(f)) => self.absorption = f,
            (names::MAX_DISTANCE, U::Float(f)) => self.max_distance = f,
            (names::NUM_STEPS, U::Float(f)) => self.num_steps = f,
            (names::NOISE_SCALE, U::Float(f)) => self.noise_scale = f,
            (names::NOISE_DETAIL, U::Float(f)) => self.noise_detail = f,
            (names::EMISSION_INTENSITY, U::Float(f)) => self.emission_intensity = f,
            (names::DENSITY_SCALE, U::Float(f)) => self.density_scale = f,

            (names::DENSITY_SOURCE, U::Int(i)) => self.density_source = i.max(0) as u32,
            (names::TEXTURE, U::Texture(handle)) => self.has_texture = u32::from(handle.is_some()),

            _ => return false,
        }
        true
    }

    pub fn camera_position(&self) -> Vec3 {
        Vec3::from_array(self.camera_position)
    }

    pub fn ambient_light(&self) -> Vec4 {
        Vec4::from_array(self.ambient_light)
    }

    pub fn light_color(&self) -> Vec4 {
        Vec4::from_array(self.light_color)
    }
}
