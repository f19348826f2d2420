//! Dense volume textures and the slot a volumetric material keeps them in.

use super::device::{RenderDevice, TextureHandle};
use crate::error::VolumeError;
use crate::volume::DensityBuffer;

/// A baked density buffer resident on the device as a cubic R8 3D texture.
///
/// Not `Clone`: exactly one owner releases it.
#[derive(Debug, PartialEq, Eq)]
pub struct VolumeTexture {
    handle: TextureHandle,
    resolution: u32,
    grid_name: String,
}

impl VolumeTexture {
    pub fn create(
        device: &mut dyn RenderDevice,
        buffer: &DensityBuffer,
        grid_name: impl Into<String>,
    ) -> Result<Self, VolumeError> {
        let handle = device.create_volume_texture(buffer)?;
        Ok(Self {
            handle,
            resolution: buffer.resolution(),
            grid_name: grid_name.into(),
        })
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Edge length in texels (equal on all three axes).
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn grid_name(&self) -> &str {
        &self.grid_name
    }

    pub fn release(self, device: &mut dyn RenderDevice) {
        device.release_volume_texture(self.handle);
    }
}

/// The textures of one loaded grid container plus the selected grid.
#[derive(Debug, Default)]
pub struct VolumeSlot {
    textures: Vec<VolumeTexture>,
    active: usize,
}

impl VolumeSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn textures(&self) -> &[VolumeTexture] {
        &self.textures
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Texture bound to `u_texture`, if any.
    pub fn active(&self) -> Option<&VolumeTexture> {
        self.textures.get(self.active)
    }

    /// Selects a grid. Out-of-range indices are ignored.
    pub fn set_active(&mut self, index: usize) -> bool {
        if index < self.textures.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Installs a new set of textures, then releases the previous set.
    pub fn replace(&mut self, device: &mut dyn RenderDevice, textures: Vec<VolumeTexture>) {
        let previous = std::mem::replace(&mut self.textures, textures);
        self.active = 0;
        for texture in previous {
            texture.release(device);
        }
    }

    pub fn release_all(&mut self, device: &mut dyn RenderDevice) {
        self.replace(device, Vec::new());
    }
}
