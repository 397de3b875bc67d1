//! Rendering surfaces.
//!
//! A [`Stage`] holds the ordered list of layers that are actually on screen,
//! bottom first. The [`Viewer`](crate::Viewer) is the only code that mutates
//! it; in steady state the list equals the active scene's layers.
//!
//! Two backends are built in and identified by [`StageType`]:
//! - `gpu`: a wgpu device, optionally presenting to a winit window
//! - `headless`: layer bookkeeping only, for tests and offscreen tooling

mod gpu;
mod headless;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::{Result, ViewerError};
use crate::layer::Layer;

pub use gpu::GpuStage;
pub use headless::HeadlessStage;

/// The rendering surface contract.
pub trait Stage {
    fn stage_type(&self) -> StageType;

    /// Layers on the stage, bottom first.
    fn layers(&self) -> &[Layer];

    /// Insert `layer` at `index`, clamped to the current length.
    fn add_layer(&mut self, layer: Layer, index: usize);

    /// Remove `layer`. Returns whether it was on the stage.
    fn remove_layer(&mut self, layer: &Layer) -> bool;

    fn set_size(&mut self, size: PhysicalSize<u32>);

    fn size(&self) -> PhysicalSize<u32>;

    /// Release the window surface, if any. The stage keeps its layers.
    fn detach(&mut self);

    /// Release every resource. The stage is unusable afterwards.
    fn destroy(&mut self);
}

/// Known stage backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageType {
    Gpu,
    Headless,
}

impl StageType {
    /// Backends tried, in order, when none is requested.
    pub const PREFERENCE: [StageType; 1] = [StageType::Gpu];

    pub fn name(&self) -> &'static str {
        match self {
            StageType::Gpu => "gpu",
            StageType::Headless => "headless",
        }
    }

    pub fn is_supported(&self) -> bool {
        match self {
            StageType::Gpu => GpuStage::is_supported(),
            StageType::Headless => true,
        }
    }

    /// The requested backend if it is supported, otherwise the first
    /// supported backend in [`PREFERENCE`](Self::PREFERENCE) order.
    pub fn resolve(requested: Option<StageType>) -> Result<StageType> {
        match requested {
            Some(ty) if ty.is_supported() => Ok(ty),
            Some(ty) => Err(ViewerError::unsupported_backend(ty.name())),
            None => Self::PREFERENCE
                .into_iter()
                .find(StageType::is_supported)
                .ok_or_else(|| ViewerError::unsupported_backend("no supported stage backend")),
        }
    }

    /// Construct a stage of this type.
    pub fn create(&self, window: Option<Arc<Window>>) -> Result<Box<dyn Stage>> {
        tracing::debug!(backend = self.name(), "creating stage");
        match self {
            StageType::Gpu => Ok(Box::new(GpuStage::new(window)?)),
            StageType::Headless => Ok(Box::new(HeadlessStage::new())),
        }
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StageType {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gpu" => Ok(StageType::Gpu),
            "headless" => Ok(StageType::Headless),
            other => Err(ViewerError::unsupported_backend(other)),
        }
    }
}

/// Ordered layer list shared by the built-in backends.
#[derive(Debug, Default)]
pub struct StageLayers {
    layers: Vec<Layer>,
}

impl StageLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Layer] {
        &self.layers
    }

    pub fn insert(&mut self, layer: Layer, index: usize) {
        let index = index.min(self.layers.len());
        tracing::trace!(layer = %layer.id(), index, "stage add");
        self.layers.insert(index, layer);
    }

    pub fn remove(&mut self, layer: &Layer) -> bool {
        match self.layers.iter().position(|l| l == layer) {
            Some(index) => {
                tracing::trace!(layer = %layer.id(), index, "stage remove");
                self.layers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for ty in [StageType::Gpu, StageType::Headless] {
            assert_eq!(ty.name().parse::<StageType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_name_is_unsupported() {
        assert!(matches!(
            "webgl".parse::<StageType>(),
            Err(ViewerError::UnsupportedBackend(name)) if name == "webgl"
        ));
    }

    #[test]
    fn headless_must_be_requested() {
        assert!(!StageType::PREFERENCE.contains(&StageType::Headless));
        assert_eq!(
            StageType::resolve(Some(StageType::Headless)).unwrap(),
            StageType::Headless
        );
    }
}
