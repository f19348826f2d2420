//! Lighting Tests - Multi-Pass Accumulation
//!
//! Drives lit materials through the recording device and checks the pass
//! structure: one pass per light, additive state after the first pass,
//! ambient only in the base pass, and state restored afterwards.

use glam::{Mat4, Vec3, Vec4};
use smokelab_engine::render::{
    pass_count, render_light_passes, BlendMode, DepthFunc, DeviceCommand, DrawCall, HeadlessDevice, Material, Mesh,
    PipelineState, RenderDevice, ShaderKind, ShaderLibrary, StandardMaterial, VolumeMaterial, VolumeParams,
};
use smokelab_engine::{Camera, FrameContext, Light, SceneSettings};

fn three_lights() -> Vec<Light> {
    vec![
        Light::new(Vec3::new(1.0, 2.0, 3.0), Vec4::new(1.0, 0.0, 0.0, 1.0)),
        Light::new(Vec3::new(-1.0, 2.0, 0.0), Vec4::new(0.0, 1.0, 0.0, 1.0)).with_intensity(0.5),
        Light::new(Vec3::new(0.0, -4.0, 1.0), Vec4::new(0.0, 0.0, 1.0, 1.0)).with_shininess(4.0),
    ]
}

// ============================================================================
// Pass Structure
// ============================================================================

#[test]
fn test_one_pass_per_light() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let lights = three_lights();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    assert_eq!(draws.len(), 3);
    assert!(draws.iter().all(|draw| draw.shader == ShaderKind::Lit));
    assert!(draws.iter().all(|draw| draw.mesh == mesh.id()));
}

#[test]
fn test_later_passes_are_additive() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let lights = three_lights();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    assert_eq!(draws[0].state.blend, BlendMode::Opaque);
    assert_eq!(draws[0].state.depth, DepthFunc::Less);
    for draw in &draws[1..] {
        assert_eq!(draw.state.blend, BlendMode::Additive);
        assert_eq!(draw.state.depth, DepthFunc::LessEqual);
    }
}

#[test]
fn test_ambient_only_in_base_pass() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let lights = three_lights();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    assert_eq!(draws[0].uniforms.ambient_light, settings.ambient_light.to_array());
    for draw in &draws[1..] {
        assert_eq!(draw.uniforms.ambient_light, [0.0; 4]);
    }
}

#[test]
fn test_lights_drawn_in_order() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::plane(2.0);
    let camera = Camera::default();
    let lights = three_lights();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    for (draw, light) in draws.iter().zip(&lights) {
        assert_eq!(draw.uniforms.light_position, light.position.to_array());
        assert_eq!(draw.uniforms.light_color, light.color.to_array());
        assert_eq!(draw.uniforms.light_intensity, light.intensity);
        assert_eq!(draw.uniforms.light_shininess, light.shininess);
    }
}

#[test]
fn test_light_order_only_changes_light_uniforms() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let lights = three_lights();
    let reversed: Vec<Light> = lights.iter().rev().cloned().collect();

    let record = |lights: &[Light]| {
        let frame = FrameContext::new(&camera, lights, &settings);
        let mut device = HeadlessDevice::new();
        material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);
        device.draws().into_iter().cloned().collect::<Vec<_>>()
    };
    let forward = record(&lights);
    let backward = record(&reversed);

    assert_eq!(forward.len(), backward.len());
    let states = |draws: &[DrawCall]| draws.iter().map(|draw| draw.state).collect::<Vec<_>>();
    assert_eq!(states(&forward), states(&backward));

    let without_light = |draw: &DrawCall| {
        let mut uniforms = draw.uniforms;
        uniforms.light_position = [0.0; 3];
        uniforms.light_color = [0.0; 4];
        uniforms.light_intensity = 0.0;
        uniforms.light_shininess = 0.0;
        uniforms
    };
    for (a, b) in forward.iter().zip(&backward) {
        assert_eq!(a.shader, b.shader);
        assert_eq!(a.mesh, b.mesh);
        assert_eq!(without_light(a), without_light(b));
    }
    assert_ne!(forward[0].uniforms.light_position, backward[0].uniforms.light_position);
}

// ============================================================================
// No Lights
// ============================================================================

#[test]
fn test_zero_lights_draws_single_ambient_pass() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    assert_eq!(draws.len(), 1);
    let uniforms = &draws[0].uniforms;
    assert_eq!(uniforms.ambient_light, settings.ambient_light.to_array());
    assert_eq!(uniforms.light_color, [0.0; 4]);
    assert_eq!(uniforms.light_intensity, 1.0);
    assert_eq!(uniforms.light_shininess, 1.0);
    assert_eq!(draws[0].state, PipelineState::default());
}

#[test]
fn test_pass_count_matches_draws() {
    let library = ShaderLibrary::embedded();
    let shader = library.get(ShaderKind::Flat).unwrap();
    let mesh = Mesh::cube(0.5);
    let camera = Camera::default();
    let settings = SceneSettings::default();

    for light_count in 0..4 {
        let lights = vec![Light::default(); light_count];
        let frame = FrameContext::new(&camera, &lights, &settings);
        let mut device = HeadlessDevice::new();
        let mut uploads = 0;

        let passes = render_light_passes(&mut device, &shader, &mesh, &frame, |_| uploads += 1);

        assert_eq!(passes, pass_count(light_count));
        assert_eq!(uploads, passes);
        assert_eq!(device.draws().len(), passes);
        assert_eq!(device.bound_shader(), None);
    }
}

// ============================================================================
// State Restoration
// ============================================================================

#[test]
fn test_state_restored_after_render() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let lights = three_lights();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    assert_eq!(device.pipeline_state(), PipelineState::default());
    assert!(matches!(
        device.commands().last(),
        Some(DeviceCommand::SetRasterState(_))
    ));
}

#[test]
fn test_caller_state_survives_render() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let lights = three_lights();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();
    device.set_blend_mode(BlendMode::Alpha);

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    assert_eq!(device.draws()[0].state.blend, BlendMode::Alpha);
    assert_eq!(device.blend_mode(), BlendMode::Alpha);
    assert_eq!(device.depth_func(), DepthFunc::Less);
}

#[test]
fn test_single_light_leaves_state_untouched() {
    let library = ShaderLibrary::embedded();
    let material = StandardMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let lights = vec![Light::default()];
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    assert!(!device
        .commands()
        .iter()
        .any(|command| matches!(command, DeviceCommand::SetBlendMode(_) | DeviceCommand::SetDepthFunc(_))));
}

// ============================================================================
// Volume Passes
// ============================================================================

#[test]
fn test_volume_uses_multi_pass_accumulation() {
    let library = ShaderLibrary::embedded();
    let material = VolumeMaterial::new(&library, VolumeParams::default());
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let lights = three_lights();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    assert_eq!(draws.len(), 3);
    assert!(draws.iter().all(|draw| draw.shader == ShaderKind::VolumeHeterogeneous));
    assert_eq!(draws[0].uniforms.ambient_light[3], 1.0);
    assert_eq!(draws[2].state.blend, BlendMode::Additive);
    assert_eq!(device.pipeline_state(), PipelineState::default());
}
