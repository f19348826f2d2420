//! volume_snapshot: bake a sparse grid file and render it to a PNG offscreen.
//!
//! Usage:
//!   cargo run --bin volume_snapshot -- <grid.json> [--config engine.json] [--out snapshot.png] [--size 1280x720]
//!
//! The scene holds a lit floor, a wireframe box on the grid bounds and the
//! volume itself, lit by the configured lights (two defaults when none are set).

use std::path::PathBuf;
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};
use smokelab_engine::render::materials::{StandardMaterial, VolumeMaterial, WireframeMaterial};
use smokelab_engine::render::{GpuContext, GpuContextConfig, Mesh, OffscreenTarget, ShaderLibrary, WgpuDevice, COLOR_FORMAT};
use smokelab_engine::volume::{resolve_world_box, GridDecoder, JsonGridDecoder, VolumeBaker, WorldBox};
use smokelab_engine::{Camera, EngineConfig, Light, Scene, SceneNode};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

struct Args {
    grid_path: PathBuf,
    config_path: Option<PathBuf>,
    out_path: PathBuf,
    width: u32,
    height: u32,
}

const USAGE: &str = "usage: volume_snapshot <grid.json> [--config path] [--out path] [--size WxH]";

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    let width = w.parse().ok()?;
    let height = h.parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

fn parse_args() -> AppResult<Args> {
    let mut grid_path = None;
    let mut config_path = None;
    let mut out_path = PathBuf::from("snapshot.png");
    let (mut width, mut height) = (1280, 720);

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().map(PathBuf::from),
            "--out" => {
                out_path = args.next().map(PathBuf::from).ok_or(USAGE)?;
            }
            "--size" => {
                let value = args.next().ok_or(USAGE)?;
                (width, height) = parse_size(&value).ok_or_else(|| format!("invalid size '{}'", value))?;
            }
            "-h" | "--help" => return Err(USAGE.into()),
            _ if grid_path.is_none() => grid_path = Some(PathBuf::from(arg)),
            other => return Err(format!("unexpected argument '{}'\n{}", other, USAGE).into()),
        }
    }

    Ok(Args {
        grid_path: grid_path.ok_or(USAGE)?,
        config_path,
        out_path,
        width,
        height,
    })
}

/// Maps the unit cube `[-1, 1]³` onto a world box.
fn box_model(world_box: &WorldBox) -> Mat4 {
    Mat4::from_translation(world_box.center()) * Mat4::from_scale(world_box.size() * 0.5)
}

fn default_lights(world_box: &WorldBox) -> Vec<Light> {
    let radius = world_box.size().length().max(1.0);
    let center = world_box.center();
    vec![
        Light::new(center + Vec3::new(1.5, 2.0, 1.0) * radius, Vec4::new(1.0, 0.9, 0.8, 1.0)).with_intensity(1.2),
        Light::new(center + Vec3::new(-2.0, 1.0, -0.5) * radius, Vec4::new(0.4, 0.5, 0.9, 1.0)).with_intensity(0.6),
    ]
}

fn main() -> AppResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_args()?;

    let config = match &args.config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let library = match &config.shader_dir {
        Some(dir) => ShaderLibrary::from_dir(dir)?,
        None => ShaderLibrary::embedded(),
    };

    let ctx = GpuContext::new_headless(GpuContextConfig::default())?;
    let mut device = WgpuDevice::new(ctx, COLOR_FORMAT);

    let decoder = JsonGridDecoder::new();
    let baker = VolumeBaker::new(config.bake)?;
    let grids = decoder.decode(&args.grid_path)?;

    let world_box = grids
        .iter()
        .filter_map(|grid| resolve_world_box(grid.as_ref()))
        .reduce(|a, b| WorldBox::new(a.min.min(b.min), a.max.max(b.max)))
        .ok_or("grid file has no active voxels")?;
    log::info!(
        "[volume_snapshot] {} grid(s), bounds {:?} .. {:?}",
        grids.len(),
        world_box.min,
        world_box.max
    );

    let mut volume = VolumeMaterial::new(&library, config.volume.clone());
    volume.load_grids(&mut device, &baker, &grids)?;

    let radius = world_box.size().length().max(1e-3);
    let center = world_box.center();
    let camera = Camera::look_at(center + Vec3::new(0.6, 0.5, 1.2) * radius, center, Vec3::Y).with_perspective(
        45f32.to_radians(),
        args.width as f32 / args.height as f32,
        radius * 0.01,
        radius * 20.0,
    );

    let mut settings = config.scene.clone();
    if settings.lights.is_empty() {
        settings.lights = default_lights(&world_box);
    }

    let model = box_model(&world_box);
    let floor_model = Mat4::from_translation(Vec3::new(center.x, world_box.min.y - radius * 0.05, center.z));
    let cube = Arc::new(Mesh::cube(1.0));

    let mut scene = Scene::new(camera, settings);
    scene.add_node(
        SceneNode::new(
            "Floor",
            Arc::new(Mesh::plane(radius * 4.0)),
            Box::new(StandardMaterial::new(&library, Vec4::new(0.55, 0.55, 0.5, 1.0))),
        )
        .with_model(floor_model),
    );
    scene.add_node(
        SceneNode::new(
            "Bounds",
            Arc::clone(&cube),
            Box::new(WireframeMaterial::new(&library, Vec4::new(0.9, 0.9, 0.2, 1.0))),
        )
        .with_model(model),
    );
    scene.add_node(SceneNode::new("Volume", cube, Box::new(volume)).with_model(model));

    scene.render(&mut device);

    let target = OffscreenTarget::new(&device.context().device, args.width, args.height);
    let background = scene.settings.background_color;
    let mut encoder = device
        .context()
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Snapshot Encoder"),
        });
    device.encode_frame(
        &mut encoder,
        &target.color_view,
        &target.depth_view,
        wgpu::Color {
            r: background.x as f64,
            g: background.y as f64,
            b: background.z as f64,
            a: background.w as f64,
        },
    );
    device.context().queue.submit(std::iter::once(encoder.finish()));

    let pixels = target.read_pixels(device.context())?;
    let image = image::RgbaImage::from_raw(target.width, target.height, pixels).ok_or("readback size mismatch")?;
    image.save(&args.out_path)?;

    log::info!(
        "[volume_snapshot] Wrote {}x{} snapshot to {}",
        target.width,
        target.height,
        args.out_path.display()
    );
    Ok(())
}
