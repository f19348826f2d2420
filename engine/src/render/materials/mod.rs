//! Materials
//!
//! A material owns the shaders and parameters used to draw a mesh and knows
//! how many passes that takes. Four implementations:
//!
//! - [`FlatMaterial`] - unlit solid colour, one pass
//! - [`WireframeMaterial`] - flat colour with line raster and no culling
//! - [`StandardMaterial`] - Phong lit, one additive pass per light
//! - [`VolumeMaterial`] - ray-marched participating medium, one pass per light
//!
//! Parameters are edited through a [`ParameterEditor`], which an immediate-mode
//! UI implements; [`MenuRecorder`] is a scripted one for tools and tests.

pub mod flat;
pub mod standard;
pub mod volume;
pub mod wireframe;

use std::collections::HashMap;
use std::ops::RangeInclusive;

use glam::{Mat4, Vec3};

use super::device::RenderDevice;
use super::mesh::Mesh;
use crate::scene::FrameContext;

pub use flat::FlatMaterial;
pub use standard::StandardMaterial;
pub use volume::{DensitySource, VolumeMaterial, VolumeParams, VolumeShading};
pub use wireframe::WireframeMaterial;

/// Editable ranges of material parameters.
pub mod ranges {
    use std::ops::RangeInclusive;

    pub const ABSORPTION: RangeInclusive<f32> = 0.0..=10.0;
    pub const STEP: RangeInclusive<f32> = 0.01..=0.2;
    pub const NOISE_SCALE: RangeInclusive<f32> = 0.0..=10.0;
    pub const NOISE_DETAIL: RangeInclusive<f32> = 0.0..=10.0;
    pub const EMISSION_INTENSITY: RangeInclusive<f32> = 0.0..=10.0;
    pub const DENSITY_SCALE: RangeInclusive<f32> = 0.0..=10.0;
}

/// Clamps a value into an inclusive range; NaN becomes the range start.
pub fn clamp_to_range(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

/// Immediate-mode parameter widgets. Each returns `true` when the value changed.
pub trait ParameterEditor {
    fn color_edit3(&mut self, label: &str, color: &mut Vec3) -> bool;

    fn slider_f32(&mut self, label: &str, value: &mut f32, range: RangeInclusive<f32>) -> bool;

    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool;

    /// Picks one of `items` by index.
    fn combo(&mut self, label: &str, selected: &mut usize, items: &[&str]) -> bool;
}

/// Render strategy for a mesh.
pub trait Material {
    fn name(&self) -> &str;

    /// Uploads this material's uniforms to the bound shader.
    fn set_uniforms(&self, device: &mut dyn RenderDevice, frame: &FrameContext, model: Mat4);

    /// Draws `mesh`. A missing mesh or shader makes this a no-op.
    fn render(&self, device: &mut dyn RenderDevice, mesh: Option<&Mesh>, model: Mat4, frame: &FrameContext);

    fn render_menu(&mut self, ui: &mut dyn ParameterEditor);
}

/// Widget kinds seen by a [`MenuRecorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum MenuWidget {
    Color(Vec3),
    Slider { value: f32, min: f32, max: f32 },
    Checkbox(bool),
    Combo { selected: usize, items: Vec<String> },
}

/// Scripted edit applied when a widget with a matching label is shown.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuEdit {
    Color(Vec3),
    Float(f32),
    Toggle(bool),
    Select(usize),
}

/// `ParameterEditor` that records every widget and applies queued edits.
#[derive(Debug, Default)]
pub struct MenuRecorder {
    widgets: Vec<(String, MenuWidget)>,
    edits: HashMap<String, MenuEdit>,
}

impl MenuRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an edit for the next time `label` is shown.
    pub fn with_edit(mut self, label: impl Into<String>, edit: MenuEdit) -> Self {
        self.edits.insert(label.into(), edit);
        self
    }

    pub fn widgets(&self) -> &[(String, MenuWidget)] {
        &self.widgets
    }

    pub fn labels(&self) -> Vec<&str> {
        self.widgets.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn widget(&self, label: &str) -> Option<&MenuWidget> {
        self.widgets
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, widget)| widget)
    }

    pub fn clear(&mut self) {
        self.widgets.clear();
    }
}

impl ParameterEditor for MenuRecorder {
    fn color_edit3(&mut self, label: &str, color: &mut Vec3) -> bool {
        let changed = match self.edits.remove(label) {
            Some(MenuEdit::Color(value)) => {
                *color = value;
                true
            }
            _ => false,
        };
        self.widgets.push((label.to_string(), MenuWidget::Color(*color)));
        changed
    }

    fn slider_f32(&mut self, label: &str, value: &mut f32, range: RangeInclusive<f32>) -> bool {
        let changed = match self.edits.remove(label) {
            Some(MenuEdit::Float(edit)) => {
                *value = edit;
                true
            }
            _ => false,
        };
        self.widgets.push((
            label.to_string(),
            MenuWidget::Slider {
                value: *value,
                min: *range.start(),
                max: *range.end(),
            },
        ));
        changed
    }

    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool {
        let changed = match self.edits.remove(label) {
            Some(MenuEdit::Toggle(edit)) => {
                *value = edit;
                true
            }
            _ => false,
        };
        self.widgets.push((label.to_string(), MenuWidget::Checkbox(*value)));
        changed
    }

    fn combo(&mut self, label: &str, selected: &mut usize, items: &[&str]) -> bool {
        let changed = match self.edits.remove(label) {
            Some(MenuEdit::Select(index)) if index < items.len() => {
                *selected = index;
                true
            }
            _ => false,
        };
        self.widgets.push((
            label.to_string(),
            MenuWidget::Combo {
                selected: *selected,
                items: items.iter().map(|item| item.to_string()).collect(),
            },
        ));
        changed
    }
}
