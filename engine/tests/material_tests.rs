//! Material Tests - State Scoping, Menus and Volume Loading
//!
//! Materials render through the recording device, menus through the
//! `MenuRecorder`, and volume loads are checked for all-or-nothing
//! texture replacement.

use std::path::Path;
use std::sync::Arc;

use glam::{IVec3, Mat4, Vec3, Vec4};
use smokelab_engine::error::{DecodeError, VolumeError};
use smokelab_engine::render::materials::volume::camera_in_model_space;
use smokelab_engine::render::materials::{MenuEdit, MenuWidget};
use smokelab_engine::render::{
    DensitySource, FlatMaterial, HeadlessDevice, Material, MenuRecorder, Mesh, PipelineState, RasterState,
    RenderDevice, ShaderKind, ShaderLibrary, StandardMaterial, VolumeMaterial, VolumeParams, VolumeShading,
    WireframeMaterial,
};
use smokelab_engine::volume::{BakeConfig, GridTransform, JsonGridDecoder, SparseGrid, SparseVoxelGrid, VolumeBaker};
use smokelab_engine::{Camera, FrameContext, Light, Scene, SceneNode, SceneSettings};

fn grid(name: &str, edge: i32) -> Box<dyn SparseGrid> {
    let mut grid = SparseVoxelGrid::new(name, GridTransform::uniform(0.1), 0.0);
    grid.fill_box(IVec3::ZERO, IVec3::splat(edge - 1), 0.75);
    Box::new(grid)
}

fn empty_grid(name: &str) -> Box<dyn SparseGrid> {
    Box::new(SparseVoxelGrid::new(name, GridTransform::uniform(0.1), 0.0))
}

fn baker(resolution: u32) -> VolumeBaker {
    VolumeBaker::new(BakeConfig::new(resolution, 0)).unwrap()
}

fn volume_labels() -> Vec<&'static str> {
    vec![
        "Color",
        "Absorption Coefficient",
        "Num step",
        "Noise scale",
        "Noise detail",
        "Emission Color",
        "Emission Intensity",
        "Density Source",
        "Density Scale",
        "Shading",
    ]
}

// ============================================================================
// Flat and Wireframe
// ============================================================================

#[test]
fn test_flat_draws_with_less_depth() {
    let library = ShaderLibrary::embedded();
    let material = FlatMaterial::new(&library, Vec4::new(1.0, 0.5, 0.0, 1.0));
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].shader, ShaderKind::Flat);
    assert_eq!(draws[0].uniforms.color, [1.0, 0.5, 0.0, 1.0]);
    assert_eq!(draws[0].index_count, 36);
    assert_eq!(device.bound_shader(), None);
}

#[test]
fn test_wireframe_is_scoped() {
    let library = ShaderLibrary::embedded();
    let material = WireframeMaterial::new(&library, Vec4::ONE);
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].state.raster, RasterState::WIREFRAME);
    assert_eq!(device.raster_state(), RasterState::default());
    assert_eq!(device.pipeline_state(), PipelineState::default());
}

#[test]
fn test_render_without_mesh_is_noop() {
    let library = ShaderLibrary::embedded();
    let camera = Camera::default();
    let lights = vec![Light::default()];
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &lights, &settings);
    let mut device = HeadlessDevice::new();

    FlatMaterial::new(&library, Vec4::ONE).render(&mut device, None, Mat4::IDENTITY, &frame);
    WireframeMaterial::new(&library, Vec4::ONE).render(&mut device, None, Mat4::IDENTITY, &frame);
    StandardMaterial::new(&library, Vec4::ONE).render(&mut device, None, Mat4::IDENTITY, &frame);
    VolumeMaterial::new(&library, VolumeParams::default()).render(&mut device, None, Mat4::IDENTITY, &frame);

    assert!(device.commands().is_empty());
}

#[test]
fn test_render_without_shader_is_noop() {
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);
    let mut device = HeadlessDevice::new();

    FlatMaterial::with_shader(None, Vec4::ONE).render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);
    StandardMaterial::with_shaders(None, None, Vec4::ONE).render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    assert!(device.commands().is_empty());
}

// ============================================================================
// Standard Material
// ============================================================================

#[test]
fn test_standard_menu_hides_color_when_showing_normals() {
    let library = ShaderLibrary::embedded();
    let mut material = StandardMaterial::new(&library, Vec4::ONE);

    let mut recorder = MenuRecorder::new();
    material.render_menu(&mut recorder);
    assert_eq!(recorder.labels(), vec!["Show Normals", "Color"]);

    let mut recorder = MenuRecorder::new().with_edit("Show Normals", MenuEdit::Toggle(true));
    material.render_menu(&mut recorder);
    assert_eq!(recorder.labels(), vec!["Show Normals"]);
    assert!(material.show_normals);
}

#[test]
fn test_standard_normals_toggle_switches_shader() {
    let library = ShaderLibrary::embedded();
    let mut material = StandardMaterial::new(&library, Vec4::ONE);
    material.show_normals = true;
    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);
    let mut device = HeadlessDevice::new();

    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    assert_eq!(device.draws()[0].shader, ShaderKind::Normals);
}

#[test]
fn test_color_edit_keeps_alpha() {
    let library = ShaderLibrary::embedded();
    let mut material = FlatMaterial::new(&library, Vec4::new(1.0, 1.0, 1.0, 0.25));
    let mut recorder = MenuRecorder::new().with_edit("Color", MenuEdit::Color(Vec3::new(0.2, 0.4, 0.6)));

    material.render_menu(&mut recorder);

    assert_eq!(material.color, Vec4::new(0.2, 0.4, 0.6, 0.25));
}

// ============================================================================
// Volume Menu
// ============================================================================

#[test]
fn test_volume_menu_labels() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut recorder = MenuRecorder::new();

    material.render_menu(&mut recorder);

    assert_eq!(recorder.labels(), volume_labels());
    assert_eq!(
        recorder.widget("Num step"),
        Some(&MenuWidget::Slider {
            value: 0.05,
            min: 0.01,
            max: 0.2
        })
    );
}

#[test]
fn test_volume_menu_lists_loaded_grids() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();
    material
        .load_grids(&mut device, &baker(4), &[grid("density", 4), grid("temperature", 4)])
        .unwrap();

    let mut recorder = MenuRecorder::new().with_edit("Active Grid", MenuEdit::Select(1));
    material.render_menu(&mut recorder);

    let mut expected = volume_labels();
    expected.push("Active Grid");
    assert_eq!(recorder.labels(), expected);
    assert_eq!(
        recorder.widget("Active Grid"),
        Some(&MenuWidget::Combo {
            selected: 1,
            items: vec!["density".to_string(), "temperature".to_string()],
        })
    );
    assert_eq!(material.slot().active_index(), 1);
}

#[test]
fn test_volume_menu_edits_are_clamped() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut recorder = MenuRecorder::new()
        .with_edit("Absorption Coefficient", MenuEdit::Float(25.0))
        .with_edit("Num step", MenuEdit::Float(0.0))
        .with_edit("Density Scale", MenuEdit::Float(3.0))
        .with_edit("Density Source", MenuEdit::Select(1))
        .with_edit("Shading", MenuEdit::Select(2));

    material.render_menu(&mut recorder);

    let params = material.params();
    assert_eq!(params.absorption, 10.0);
    assert_eq!(params.step, 0.01);
    assert_eq!(params.density_scale, 3.0);
    assert_eq!(params.density_source, DensitySource::Noise);
    assert_eq!(params.shading, VolumeShading::Emission);
}

#[test]
fn test_volume_menu_edits_reach_uniforms() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut recorder = MenuRecorder::new()
        .with_edit("Density Source", MenuEdit::Select(2))
        .with_edit("Shading", MenuEdit::Select(2))
        .with_edit("Emission Intensity", MenuEdit::Float(4.0));
    material.render_menu(&mut recorder);

    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);
    let mut device = HeadlessDevice::new();
    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draw = device.draws()[0].clone();
    assert_eq!(draw.shader, ShaderKind::VolumeEmission);
    assert_eq!(draw.uniforms.density_source, 2);
    assert_eq!(draw.uniforms.emission_intensity, 4.0);
    assert_eq!(draw.uniforms.has_texture, 0);
    assert_eq!(draw.texture, None);
}

// ============================================================================
// Volume Uniforms
// ============================================================================

#[test]
fn test_volume_uniforms_use_model_space_camera() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();
    material.load_grids(&mut device, &baker(4), &[grid("density", 4)]).unwrap();

    let model = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
    let mesh = Mesh::cube(1.0);
    let camera = Camera::look_at(Vec3::new(3.0, 0.0, 8.0), Vec3::new(3.0, 0.0, 0.0), Vec3::Y);
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);
    material.render(&mut device, Some(&mesh), model, &frame);

    let draw = device.draws()[0].clone();
    let expected = camera_in_model_space(model, camera.eye);
    assert!((Vec3::from_array(draw.uniforms.local_camera_position) - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-5);
    assert_eq!(draw.uniforms.local_camera_position, expected.to_array());
    assert_eq!(draw.uniforms.box_min, [-1.0; 3]);
    assert_eq!(draw.uniforms.box_max, [1.0; 3]);
    assert_eq!(draw.uniforms.has_texture, 1);
    assert_eq!(draw.texture, material.slot().active().map(|texture| texture.handle()));
}

#[test]
fn test_active_grid_selects_texture() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();
    material
        .load_grids(&mut device, &baker(4), &[grid("density", 4), grid("flame", 2)])
        .unwrap();
    let second = material.slot().textures()[1].handle();

    assert!(material.set_active_grid(1));
    assert!(!material.set_active_grid(2));

    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);
    material.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    assert_eq!(device.draws()[0].texture, Some(second));
}

#[test]
fn test_materials_sharing_a_shader_keep_their_own_texture() {
    let library = ShaderLibrary::embedded();
    let mut loaded = VolumeMaterial::new(&library, VolumeParams::default());
    let empty = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();
    loaded.load_grids(&mut device, &baker(4), &[grid("density", 4)]).unwrap();

    let mesh = Mesh::cube(1.0);
    let camera = Camera::default();
    let settings = SceneSettings::default();
    let frame = FrameContext::new(&camera, &[], &settings);

    loaded.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);
    empty.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draws = device.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].shader_id, draws[1].shader_id);
    assert!(draws[0].texture.is_some());
    assert_eq!(draws[0].uniforms.has_texture, 1);
    assert_eq!(draws[1].texture, None);
    assert_eq!(draws[1].uniforms.has_texture, 0);

    loaded.release(&mut device);
    device.clear_commands();
    loaded.render(&mut device, Some(&mesh), Mat4::IDENTITY, &frame);

    let draw = device.draws()[0].clone();
    assert_eq!(draw.texture, None);
    assert_eq!(draw.uniforms.has_texture, 0);
}

// ============================================================================
// Volume Loading
// ============================================================================

#[test]
fn test_load_creates_one_texture_per_grid() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();

    let count = material
        .load_grids(&mut device, &baker(8), &[grid("density", 4), grid("temperature", 4)])
        .unwrap();

    assert_eq!(count, 2);
    assert_eq!(device.live_texture_count(), 2);
    for texture in material.slot().textures() {
        assert_eq!(device.texture_resolution(texture.handle()), Some(8));
        assert!(device.texture_texels(texture.handle()).unwrap().iter().any(|&t| t == 191));
    }
}

#[test]
fn test_reload_releases_previous_textures() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();

    material.load_grids(&mut device, &baker(4), &[grid("density", 4)]).unwrap();
    let first = material.slot().textures()[0].handle();
    material.load_grids(&mut device, &baker(4), &[grid("density", 6)]).unwrap();

    assert!(!device.is_live(first));
    assert_eq!(device.live_texture_count(), 1);
    assert_eq!(material.slot().len(), 1);
}

#[test]
fn test_failed_bake_keeps_previous_texture() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();
    material.load_grids(&mut device, &baker(4), &[grid("density", 4)]).unwrap();
    let previous = material.slot().textures()[0].handle();

    let result = material.load_grids(&mut device, &baker(4), &[grid("density", 4), empty_grid("empty")]);

    assert!(matches!(result, Err(VolumeError::DegenerateBounds { .. })));
    assert!(device.is_live(previous));
    assert_eq!(device.live_texture_count(), 1);
    assert_eq!(material.slot().active().map(|texture| texture.handle()), Some(previous));
}

#[test]
fn test_texture_limit_is_resource_exhaustion() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new().with_max_texture_dimension(8);
    material.load_grids(&mut device, &baker(8), &[grid("density", 4)]).unwrap();
    let previous = material.slot().textures()[0].handle();

    let result = material.load_grids(&mut device, &baker(16), &[grid("density", 4), grid("flame", 4)]);

    assert!(matches!(result, Err(VolumeError::ResourceExhaustion(_))));
    assert!(device.is_live(previous));
    assert_eq!(device.live_texture_count(), 1);
}

#[test]
fn test_empty_container_is_no_grids() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();

    let result = material.load_grids(&mut device, &baker(4), &[]);
    assert!(matches!(result, Err(VolumeError::NoGrids)));

    let path = std::env::temp_dir().join("smokelab_material_tests_empty.json");
    std::fs::write(&path, r#"{ "grids": [] }"#).unwrap();
    let result = material.load_volume(&mut device, &JsonGridDecoder::new(), &baker(4), &path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(VolumeError::NoGrids)));
    assert!(material.slot().is_empty());
}

#[test]
fn test_decode_errors_propagate() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();

    let result = material.load_volume(
        &mut device,
        &JsonGridDecoder::new(),
        &baker(4),
        Path::new("/nonexistent/smokelab/smoke.json"),
    );
    assert!(matches!(result, Err(VolumeError::Decode(DecodeError::Io(_)))));

    let path = std::env::temp_dir().join("smokelab_material_tests_vector.json");
    std::fs::write(&path, r#"{ "grids": [{ "name": "vel", "type": "vec3s" }] }"#).unwrap();
    let result = material.load_volume(&mut device, &JsonGridDecoder::new(), &baker(4), &path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(
        result,
        Err(VolumeError::Decode(DecodeError::UnsupportedGridType { .. }))
    ));
    assert_eq!(device.live_texture_count(), 0);
}

#[test]
fn test_release_frees_all_textures() {
    let library = ShaderLibrary::embedded();
    let mut material = VolumeMaterial::new(&library, VolumeParams::default());
    let mut device = HeadlessDevice::new();
    material
        .load_grids(&mut device, &baker(4), &[grid("density", 4), grid("flame", 4)])
        .unwrap();

    material.release(&mut device);

    assert_eq!(device.live_texture_count(), 0);
    assert!(material.slot().is_empty());
}

// ============================================================================
// Scene
// ============================================================================

#[test]
fn test_scene_renders_nodes_in_order() {
    let library = ShaderLibrary::embedded();
    let cube = Arc::new(Mesh::cube(1.0));
    let mut settings = SceneSettings::default();
    settings.lights = vec![Light::default(), Light::default()];

    let mut scene = Scene::new(Camera::default(), settings);
    scene.add_node(SceneNode::new("Floor", Arc::new(Mesh::plane(4.0)), Box::new(StandardMaterial::new(&library, Vec4::ONE))));
    scene.add_node(SceneNode::new("Bounds", Arc::clone(&cube), Box::new(WireframeMaterial::new(&library, Vec4::ONE))));
    scene.add_node(SceneNode::new("Volume", cube, Box::new(VolumeMaterial::new(&library, VolumeParams::default()))));
    if let Some(node) = scene.node_mut("Bounds") {
        node.visible = false;
    }

    let mut device = HeadlessDevice::new();
    scene.render(&mut device);

    let shaders: Vec<ShaderKind> = device.draws().iter().map(|draw| draw.shader).collect();
    assert_eq!(
        shaders,
        vec![
            ShaderKind::Lit,
            ShaderKind::Lit,
            ShaderKind::VolumeHeterogeneous,
            ShaderKind::VolumeHeterogeneous
        ]
    );
    assert_eq!(device.pipeline_state(), PipelineState::default());

    let mut recorder = MenuRecorder::new();
    scene.render_menu(&mut recorder);
    assert_eq!(recorder.labels()[..2], ["Show Normals", "Color"]);
}
