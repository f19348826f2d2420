//! Scoped render-state overrides.
//!
//! A `StateScope` snapshots the device's blend, depth and raster state when it
//! is opened and writes the snapshot back when dropped, so an override made
//! inside the scope cannot outlive it, early returns included.

use std::ops::{Deref, DerefMut};

use super::device::{PipelineState, RenderDevice};

pub struct StateScope<'a> {
    device: &'a mut dyn RenderDevice,
    saved: PipelineState,
}

impl<'a> StateScope<'a> {
    pub fn new(device: &'a mut dyn RenderDevice) -> Self {
        let saved = device.pipeline_state();
        Self { device, saved }
    }

    /// State that will be restored on drop.
    pub fn saved(&self) -> PipelineState {
        self.saved
    }
}

impl<'a> Deref for StateScope<'a> {
    type Target = dyn RenderDevice + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.device
    }
}

impl<'a> DerefMut for StateScope<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.device
    }
}

impl Drop for StateScope<'_> {
    fn drop(&mut self) {
        if self.device.pipeline_state() != self.saved {
            self.device.set_pipeline_state(self.saved);
        }
    }
}
