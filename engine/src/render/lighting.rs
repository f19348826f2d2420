//! Multi-Pass Lighting Accumulator
//!
//! Shaders light a surface with one light at a time; N lights are handled by
//! drawing the mesh N times and adding the passes together:
//!
//! - pass 0 uses the current (default) state and the full ambient term
//! - every later pass uses additive blending, `LessEqual` depth and zero ambient
//! - with no lights, one ambient-only pass with neutral light uniforms is drawn
//!
//! The accumulator leaves the additive state in place; callers wrap the call
//! in a [`StateScope`](super::state_scope::StateScope).

use glam::{Mat4, Vec4};

use super::device::{BlendMode, DepthFunc, RenderDevice, UniformValue};
use super::mesh::Mesh;
use super::shader_loader::Shader;
use super::uniforms::names;
use crate::scene::FrameContext;

/// Number of passes drawn for a light list.
#[inline]
pub fn pass_count(light_count: usize) -> usize {
    light_count.max(1)
}

/// Draws `mesh` once per light (or once with no lights).
///
/// `upload` sets the material's own uniforms and runs at the start of every
/// pass, after the shader is bound. Returns the number of passes drawn.
pub fn render_light_passes(
    device: &mut dyn RenderDevice,
    shader: &Shader,
    mesh: &Mesh,
    frame: &FrameContext,
    mut upload: impl FnMut(&mut dyn RenderDevice),
) -> usize {
    let passes = pass_count(frame.lights.len());

    for pass in 0..passes {
        device.bind_shader(shader);
        upload(&mut *device);

        if pass == 1 {
            device.set_blend_mode(BlendMode::Additive);
            device.set_depth_func(DepthFunc::LessEqual);
        }

        let ambient = if pass == 0 { frame.ambient_light } else { Vec4::ZERO };
        device.set_uniform(names::AMBIENT_LIGHT, UniformValue::Vec4(ambient));

        match frame.lights.get(pass) {
            Some(light) => light.set_uniforms(device),
            None => set_neutral_light(device),
        }

        device.draw_mesh(mesh);
    }

    device.unbind_shader();
    passes
}

/// Light uniforms for the ambient-only pass.
pub fn set_neutral_light(device: &mut dyn RenderDevice) {
    device.set_uniform(names::LIGHT_INTENSITY, UniformValue::Float(1.0));
    device.set_uniform(names::LIGHT_SHININESS, UniformValue::Float(1.0));
    device.set_uniform(names::LIGHT_COLOR, UniformValue::Vec4(Vec4::ZERO));
}

/// Camera and transform uniforms every lit material uploads.
pub fn set_camera_uniforms(device: &mut dyn RenderDevice, frame: &FrameContext, model: Mat4) {
    device.set_uniform(names::VIEW_PROJECTION, UniformValue::Mat4(frame.camera.view_projection()));
    device.set_uniform(names::CAMERA_POSITION, UniformValue::Vec3(frame.camera.eye));
    device.set_uniform(names::MODEL, UniformValue::Mat4(model));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_count() {
        assert_eq!(pass_count(0), 1);
        assert_eq!(pass_count(1), 1);
        assert_eq!(pass_count(5), 5);
    }
}
