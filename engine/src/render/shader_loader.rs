//! Shader Loading Utilities
//!
//! Shader programs are assembled from WGSL files: `common.wgsl` (the uniform
//! block, bindings and the shared vertex stage) is prepended to a body file
//! holding the fragment entry points. Sources are embedded at compile time;
//! a runtime directory can override individual files.
//!
//! [`ShaderLibrary`] interns one reference-counted [`Shader`] per
//! [`ShaderKind`], so every material asking for the same program shares it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shader source that can be either embedded at compile time or loaded at runtime.
#[derive(Debug, Clone)]
pub enum ShaderSource {
    /// Embedded shader source (faster, no file I/O at runtime)
    Embedded(&'static str),
    /// Runtime-loaded shader source
    Runtime(String),
}

impl ShaderSource {
    /// Get the shader source as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            ShaderSource::Embedded(s) => s,
            ShaderSource::Runtime(s) => s.as_str(),
        }
    }
}

/// Load a shader from the filesystem at runtime.
pub fn load_shader_file(path: impl AsRef<Path>) -> Result<ShaderSource, std::io::Error> {
    let source = std::fs::read_to_string(path)?;
    Ok(ShaderSource::Runtime(source))
}

/// Create a wgpu shader module from the given source.
pub fn create_shader_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

/// Embedded WGSL sources.
pub mod embedded {
    pub const COMMON: &str = include_str!("../../../shaders/common.wgsl");
    pub const BASIC: &str = include_str!("../../../shaders/basic.wgsl");
    pub const VOLUME: &str = include_str!("../../../shaders/volume.wgsl");
}

/// File names looked up in a runtime shader directory.
pub mod paths {
    pub const COMMON: &str = "common.wgsl";
    pub const BASIC: &str = "basic.wgsl";
    pub const VOLUME: &str = "volume.wgsl";
}

/// Vertex entry point shared by every program.
pub const VERTEX_ENTRY: &str = "vs_main";

/// Body file a program's fragment stage lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderBody {
    Basic,
    Volume,
}

/// Every shader program the engine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderKind {
    /// Unlit solid colour
    Flat,
    /// Phong lighting, one light per pass
    Lit,
    /// Normal visualisation
    Normals,
    /// Homogeneous absorption-only ray march
    VolumeAbsorption,
    /// Heterogeneous density (texture, noise or constant) with absorption
    VolumeHeterogeneous,
    /// Heterogeneous density with emission
    VolumeEmission,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 6] = [
        ShaderKind::Flat,
        ShaderKind::Lit,
        ShaderKind::Normals,
        ShaderKind::VolumeAbsorption,
        ShaderKind::VolumeHeterogeneous,
        ShaderKind::VolumeEmission,
    ];

    pub fn body(self) -> ShaderBody {
        match self {
            ShaderKind::Flat | ShaderKind::Lit | ShaderKind::Normals => ShaderBody::Basic,
            _ => ShaderBody::Volume,
        }
    }

    pub fn fragment_entry(self) -> &'static str {
        match self {
            ShaderKind::Flat => "fs_flat",
            ShaderKind::Lit => "fs_lit",
            ShaderKind::Normals => "fs_normals",
            ShaderKind::VolumeAbsorption => "fs_absorption",
            ShaderKind::VolumeHeterogeneous => "fs_heterogeneous",
            ShaderKind::VolumeEmission => "fs_emission",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShaderKind::Flat => "Flat Shader",
            ShaderKind::Lit => "Lit Shader",
            ShaderKind::Normals => "Normals Shader",
            ShaderKind::VolumeAbsorption => "Volume Absorption Shader",
            ShaderKind::VolumeHeterogeneous => "Volume Heterogeneous Shader",
            ShaderKind::VolumeEmission => "Volume Emission Shader",
        }
    }
}

/// Identity of one loaded shader program, unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u64);

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

/// A composed shader program.
#[derive(Debug)]
pub struct Shader {
    id: ShaderId,
    kind: ShaderKind,
    source: String,
}

impl Shader {
    fn new(kind: ShaderKind, source: String) -> Self {
        Self {
            id: ShaderId(NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            source,
        }
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    /// Full WGSL module (common prelude plus body).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fragment_entry(&self) -> &'static str {
        self.kind.fragment_entry()
    }
}

/// Concatenates the common prelude and a body into one WGSL module.
pub fn compose_source(common: &str, body: &str) -> String {
    let mut source = String::with_capacity(common.len() + body.len() + 1);
    source.push_str(common);
    source.push('\n');
    source.push_str(body);
    source
}

/// Interned shader programs, one per kind.
pub struct ShaderLibrary {
    shaders: HashMap<ShaderKind, Arc<Shader>>,
}

impl ShaderLibrary {
    /// Library built from the embedded sources.
    pub fn embedded() -> Self {
        Self::from_sources(
            &ShaderSource::Embedded(embedded::COMMON),
            &ShaderSource::Embedded(embedded::BASIC),
            &ShaderSource::Embedded(embedded::VOLUME),
        )
    }

    /// Library whose files are read from `dir` where present, falling back
    /// to the embedded source per file.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let dir = dir.as_ref();
        let load = |name: &str, fallback: &'static str| -> Result<ShaderSource, std::io::Error> {
            let path = dir.join(name);
            if path.is_file() {
                log::info!("[ShaderLibrary] Loading runtime shader {}", path.display());
                load_shader_file(&path)
            } else {
                Ok(ShaderSource::Embedded(fallback))
            }
        };

        let common = load(paths::COMMON, embedded::COMMON)?;
        let basic = load(paths::BASIC, embedded::BASIC)?;
        let volume = load(paths::VOLUME, embedded::VOLUME)?;
        Ok(Self::from_sources(&common, &basic, &volume))
    }

    fn from_sources(common: &ShaderSource, basic: &ShaderSource, volume: &ShaderSource) -> Self {
        let shaders = ShaderKind::ALL
            .iter()
            .map(|&kind| {
                let body = match kind.body() {
                    ShaderBody::Basic => basic,
                    ShaderBody::Volume => volume,
                };
                let shader = Shader::new(kind, compose_source(common.as_str(), body.as_str()));
                (kind, Arc::new(shader))
            })
            .collect();
        Self { shaders }
    }

    /// Shared handle to a program. Repeated calls return the same `Arc`.
    pub fn get(&self, kind: ShaderKind) -> Option<Arc<Shader>> {
        self.shaders.get(&kind).cloned()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::embedded()
    }
}
