//! Volumetric Material
//!
//! Renders a participating medium by ray marching inside the mesh's bounds
//! (normally a cube proxy). The fragment shaders march in model space, so the
//! camera position is uploaded transformed by the inverse model matrix.
//!
//! Density comes from a baked grid texture, procedural noise or a constant,
//! selected by [`DensitySource`]. The textures live in a [`VolumeSlot`] that
//! [`VolumeMaterial::load_volume`] fills; a failed load leaves it untouched.

use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::{clamp_to_range, ranges, Material, ParameterEditor};
use crate::error::VolumeError;
use crate::render::device::{RenderDevice, UniformValue};
use crate::render::lighting::render_light_passes;
use crate::render::mesh::Mesh;
use crate::render::shader_loader::{Shader, ShaderKind, ShaderLibrary};
use crate::render::state_scope::StateScope;
use crate::render::uniforms::names;
use crate::render::volume_texture::{VolumeSlot, VolumeTexture};
use crate::scene::FrameContext;
use crate::volume::{GridDecoder, SparseGrid, VolumeBaker};

/// Where the ray marcher reads density from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensitySource {
    /// Baked grid texture
    #[default]
    Vdb,
    Noise,
    Constant,
}

impl DensitySource {
    pub const ALL: [DensitySource; 3] = [DensitySource::Vdb, DensitySource::Noise, DensitySource::Constant];
    pub const LABELS: [&'static str; 3] = ["VDB File", "Noise", "Constant"];

    pub fn index(self) -> usize {
        match self {
            DensitySource::Vdb => 0,
            DensitySource::Noise => 1,
            DensitySource::Constant => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Shading model, one fragment program each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeShading {
    /// Homogeneous medium, absorption only
    Absorption,
    /// Varying density with absorption
    #[default]
    Heterogeneous,
    /// Varying density with absorption and emission
    Emission,
}

impl VolumeShading {
    pub const ALL: [VolumeShading; 3] = [
        VolumeShading::Absorption,
        VolumeShading::Heterogeneous,
        VolumeShading::Emission,
    ];
    pub const LABELS: [&'static str; 3] = ["Absorption", "Heterogeneous", "Emission"];

    pub fn index(self) -> usize {
        match self {
            VolumeShading::Absorption => 0,
            VolumeShading::Heterogeneous => 1,
            VolumeShading::Emission => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn shader_kind(self) -> ShaderKind {
        match self {
            VolumeShading::Absorption => ShaderKind::VolumeAbsorption,
            VolumeShading::Heterogeneous => ShaderKind::VolumeHeterogeneous,
            VolumeShading::Emission => ShaderKind::VolumeEmission,
        }
    }
}

/// Editable ray-march parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParams {
    pub color: Vec4,
    pub absorption: f32,
    /// Ray-march step length in model units (`u_numSteps`)
    pub step: f32,
    pub noise_scale: f32,
    pub noise_detail: f32,
    pub emission_color: Vec3,
    pub emission_intensity: f32,
    pub density_source: DensitySource,
    pub density_scale: f32,
    pub max_distance: f32,
    pub shading: VolumeShading,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            absorption: 1.0,
            step: 0.05,
            noise_scale: 10.0,
            noise_detail: 1.5,
            emission_color: Vec3::new(1.0, 0.6, 0.2),
            emission_intensity: 1.5,
            density_source: DensitySource::Vdb,
            density_scale: 1.0,
            max_distance: 100.0,
            shading: VolumeShading::Heterogeneous,
        }
    }
}

impl VolumeParams {
    /// Copy with every slider value inside its editable range.
    pub fn clamped(mut self) -> Self {
        self.absorption = clamp_to_range(self.absorption, &ranges::ABSORPTION);
        self.step = clamp_to_range(self.step, &ranges::STEP);
        self.noise_scale = clamp_to_range(self.noise_scale, &ranges::NOISE_SCALE);
        self.noise_detail = clamp_to_range(self.noise_detail, &ranges::NOISE_DETAIL);
        self.emission_intensity = clamp_to_range(self.emission_intensity, &ranges::EMISSION_INTENSITY);
        self.density_scale = clamp_to_range(self.density_scale, &ranges::DENSITY_SCALE);
        self
    }

    pub fn validate(&self) -> Result<(), VolumeError> {
        if !self.max_distance.is_finite() || self.max_distance <= 0.0 {
            return Err(VolumeError::Configuration(format!(
                "volume max distance must be positive, got {}",
                self.max_distance
            )));
        }
        Ok(())
    }
}

/// Camera position in a model's local space: `inverse(model) * eye`, divided by w.
pub fn camera_in_model_space(model: Mat4, eye: Vec3) -> Vec3 {
    let local = model.inverse() * eye.extend(1.0);
    local.truncate() / local.w
}

pub struct VolumeMaterial {
    absorption_shader: Option<Arc<Shader>>,
    heterogeneous_shader: Option<Arc<Shader>>,
    emission_shader: Option<Arc<Shader>>,
    params: VolumeParams,
    slot: VolumeSlot,
}

impl VolumeMaterial {
    pub fn new(library: &ShaderLibrary, params: VolumeParams) -> Self {
        Self {
            absorption_shader: library.get(ShaderKind::VolumeAbsorption),
            heterogeneous_shader: library.get(ShaderKind::VolumeHeterogeneous),
            emission_shader: library.get(ShaderKind::VolumeEmission),
            params: params.clamped(),
            slot: VolumeSlot::new(),
        }
    }

    pub fn params(&self) -> &VolumeParams {
        &self.params
    }

    pub fn set_params(&mut self, params: VolumeParams) {
        self.params = params.clamped();
    }

    pub fn slot(&self) -> &VolumeSlot {
        &self.slot
    }

    /// Selects which loaded grid binds to `u_texture`.
    pub fn set_active_grid(&mut self, index: usize) -> bool {
        self.slot.set_active(index)
    }

    /// Shader of the current shading model.
    pub fn active_shader(&self) -> Option<&Arc<Shader>> {
        match self.params.shading {
            VolumeShading::Absorption => self.absorption_shader.as_ref(),
            VolumeShading::Heterogeneous => self.heterogeneous_shader.as_ref(),
            VolumeShading::Emission => self.emission_shader.as_ref(),
        }
    }

    /// Decodes, bakes and uploads every grid of a container, then replaces
    /// the current textures. Returns the number of grids loaded.
    pub fn load_volume(
        &mut self,
        device: &mut dyn RenderDevice,
        decoder: &dyn GridDecoder,
        baker: &VolumeBaker,
        path: &Path,
    ) -> Result<usize, VolumeError> {
        log::info!("[VolumeMaterial] Loading volume {}", path.display());
        let grids = decoder.decode(path)?;
        self.load_grids(device, baker, &grids)
    }

    /// Bakes and uploads already decoded grids, replacing the current textures.
    ///
    /// Every grid is baked before any texture is created; textures created by
    /// a load that later fails are released again.
    pub fn load_grids(
        &mut self,
        device: &mut dyn RenderDevice,
        baker: &VolumeBaker,
        grids: &[Box<dyn SparseGrid>],
    ) -> Result<usize, VolumeError> {
        if grids.is_empty() {
            return Err(VolumeError::NoGrids);
        }

        let buffers = baker.bake_all(grids)?;

        let mut textures = Vec::with_capacity(buffers.len());
        for (grid, buffer) in grids.iter().zip(&buffers) {
            match VolumeTexture::create(device, buffer, grid.name()) {
                Ok(texture) => textures.push(texture),
                Err(err) => {
                    for texture in textures {
                        texture.release(device);
                    }
                    return Err(err);
                }
            }
        }

        let count = textures.len();
        self.slot.replace(device, textures);
        log::info!("[VolumeMaterial] Loaded {} grid texture(s)", count);
        Ok(count)
    }

    /// Releases every texture this material owns.
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        self.slot.release_all(device);
    }
}

impl Material for VolumeMaterial {
    fn name(&self) -> &str {
        "Volume"
    }

    fn set_uniforms(&self, device: &mut dyn RenderDevice, frame: &FrameContext, model: Mat4) {
        let params = &self.params;
        let local_eye = camera_in_model_space(model, frame.camera.eye);

        device.set_uniform(names::VIEW_PROJECTION, UniformValue::Mat4(frame.camera.view_projection()));
        device.set_uniform(names::LOCAL_CAMERA_POSITION, UniformValue::Vec3(local_eye));
        device.set_uniform(names::MODEL, UniformValue::Mat4(model));
        device.set_uniform(names::COLOR, UniformValue::Vec4(params.color));
        device.set_uniform(names::ABSORPTION_COEFFICIENT, UniformValue::Float(params.absorption));
        device.set_uniform(names::BACKGROUND_COLOR, UniformValue::Vec4(frame.background_color));
        device.set_uniform(names::VIEW, UniformValue::Mat4(frame.camera.view_matrix()));
        device.set_uniform(names::BOX_MIN, UniformValue::Vec3(frame.box_min));
        device.set_uniform(names::BOX_MAX, UniformValue::Vec3(frame.box_max));

        device.set_uniform(names::MAX_DISTANCE, UniformValue::Float(params.max_distance));
        device.set_uniform(names::NUM_STEPS, UniformValue::Float(params.step));
        device.set_uniform(names::NOISE_SCALE, UniformValue::Float(params.noise_scale));
        device.set_uniform(names::NOISE_DETAIL, UniformValue::Float(params.noise_detail));
        device.set_uniform(names::EMISSION_COLOR, UniformValue::Vec3(params.emission_color));
        device.set_uniform(names::EMISSION_INTENSITY, UniformValue::Float(params.emission_intensity));
        device.set_uniform(names::DENSITY_SOURCE, UniformValue::Int(params.density_source.index() as i32));
        device.set_uniform(names::DENSITY_SCALE, UniformValue::Float(params.density_scale));

        // Written on every call, including `None`: bindings live on the shared shader.
        let texture = self.slot.active().map(|texture| texture.handle());
        device.set_uniform(names::TEXTURE, UniformValue::Texture(texture));
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
        let params = &mut self.params;

        let mut rgb = params.color.truncate();
        if ui.color_edit3("Color", &mut rgb) {
            params.color = rgb.extend(params.color.w);
        }

        let sliders: [(&str, &mut f32, std::ops::RangeInclusive<f32>); 4] = [
            ("Absorption Coefficient", &mut params.absorption, ranges::ABSORPTION),
            ("Num step", &mut params.step, ranges::STEP),
            ("Noise scale", &mut params.noise_scale, ranges::NOISE_SCALE),
            ("Noise detail", &mut params.noise_detail, ranges::NOISE_DETAIL),
        ];
        for (label, value, range) in sliders {
            if ui.slider_f32(label, value, range.clone()) {
                *value = clamp_to_range(*value, &range);
            }
        }

        ui.color_edit3("Emission Color", &mut params.emission_color);
        if ui.slider_f32("Emission Intensity", &mut params.emission_intensity, ranges::EMISSION_INTENSITY) {
            params.emission_intensity = clamp_to_range(params.emission_intensity, &ranges::EMISSION_INTENSITY);
        }

        let mut source = params.density_source.index();
        if ui.combo("Density Source", &mut source, &DensitySource::LABELS) {
            params.density_source = DensitySource::from_index(source).unwrap_or_default();
        }
        if ui.slider_f32("Density Scale", &mut params.density_scale, ranges::DENSITY_SCALE) {
            params.density_scale = clamp_to_range(params.density_scale, &ranges::DENSITY_SCALE);
        }

        let mut shading = params.shading.index();
        if ui.combo("Shading", &mut shading, &VolumeShading::LABELS) {
            params.shading = VolumeShading::from_index(shading).unwrap_or_default();
        }

        if !self.slot.is_empty() {
            let names: Vec<&str> = self.slot.textures().iter().map(|t| t.grid_name()).collect();
            let mut active = self.slot.active_index();
            if ui.combo("Active Grid", &mut active, &names) {
                self.slot.set_active(active);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_in_model_space() {
        let model = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
        let local = camera_in_model_space(model, Vec3::new(4.0, 2.0, 0.0));
        assert!((local - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_default_params_are_in_range() {
        let params = VolumeParams::default();
        assert_eq!(params, params.clamped());
    }

    #[test]
    fn test_clamped_params() {
        let params = VolumeParams {
            step: 10.0,
            noise_scale: 10.5,
            absorption: -1.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.step, 0.2);
        assert_eq!(params.noise_scale, 10.0);
        assert_eq!(params.absorption, 0.0);
    }

    #[test]
    fn test_params_from_partial_json() {
        let params: VolumeParams =
            serde_json::from_str(r#"{ "density_source": "noise", "shading": "emission" }"#).unwrap();
        assert_eq!(params.density_source, DensitySource::Noise);
        assert_eq!(params.shading, VolumeShading::Emission);
        assert_eq!(params.absorption, 1.0);
    }
}
