//! wgpu-backed stage.
//!
//! [`GpuStage`] owns the wgpu instance, adapter, device and queue that a
//! renderer draws the stage's layers with. When created with a window it
//! also owns a configured surface for presenting to it.
//!
//! Device acquisition blocks on wgpu's async requests with `pollster`, so
//! constructing a stage may take a moment on first use.

use std::fmt;
use std::sync::{Arc, OnceLock};

use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::{Stage, StageLayers, StageType};
use crate::error::{Result, ViewerError};
use crate::layer::Layer;

struct Presentation {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

/// Stage backed by a wgpu device.
pub struct GpuStage {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    presentation: Option<Presentation>,
    layers: StageLayers,
    size: PhysicalSize<u32>,
}

fn instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    })
}

impl GpuStage {
    /// Whether a wgpu adapter can be acquired on this machine.
    ///
    /// Probed once per process.
    pub fn is_supported() -> bool {
        static SUPPORTED: OnceLock<bool> = OnceLock::new();
        *SUPPORTED.get_or_init(|| {
            let supported =
                pollster::block_on(instance().request_adapter(&wgpu::RequestAdapterOptions::default()))
                    .is_ok();
            tracing::debug!(supported, "probed gpu stage support");
            supported
        })
    }

    /// Acquire a device, presenting to `window` if one is given.
    pub fn new(window: Option<Arc<Window>>) -> Result<Self> {
        let instance = instance();

        let surface = match &window {
            Some(window) => Some(
                instance
                    .create_surface(Arc::clone(window))
                    .map_err(|e| ViewerError::gpu(e.to_string()))?,
            ),
            None => None,
        };

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface.as_ref(),
            force_fallback_adapter: false,
        }))
        .map_err(|e| ViewerError::gpu(e.to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Periscope Stage Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| ViewerError::gpu(e.to_string()))?;

        let size = window
            .as_ref()
            .map(|w| w.inner_size())
            .unwrap_or_default();

        let mut stage = Self {
            instance,
            adapter,
            device,
            queue,
            presentation: None,
            layers: StageLayers::new(),
            size,
        };
        if let Some(surface) = surface {
            stage.present_to(surface)?;
        }
        tracing::debug!(adapter = %stage.adapter.get_info().name, "gpu stage ready");
        Ok(stage)
    }

    fn present_to(&mut self, surface: wgpu::Surface<'static>) -> Result<()> {
        let caps = surface.get_capabilities(&self.adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| ViewerError::gpu("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: self.size.width,
            height: self.size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        if config.width > 0 && config.height > 0 {
            surface.configure(&self.device, &config);
        }
        self.presentation = Some(Presentation { surface, config });
        Ok(())
    }

    /// Start presenting to `window`, replacing any previous surface.
    pub fn attach(&mut self, window: Arc<Window>) -> Result<()> {
        self.size = window.inner_size();
        let surface = self
            .instance
            .create_surface(window)
            .map_err(|e| ViewerError::gpu(e.to_string()))?;
        self.present_to(surface)
    }

    pub fn is_attached(&self) -> bool {
        self.presentation.is_some()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface(&self) -> Option<&wgpu::Surface<'static>> {
        self.presentation.as_ref().map(|p| &p.surface)
    }
}

impl Stage for GpuStage {
    fn stage_type(&self) -> StageType {
        StageType::Gpu
    }

    fn layers(&self) -> &[Layer] {
        self.layers.as_slice()
    }

    fn add_layer(&mut self, layer: Layer, index: usize) {
        self.layers.insert(layer, index);
    }

    fn remove_layer(&mut self, layer: &Layer) -> bool {
        self.layers.remove(layer)
    }

    /// Reconfigure the surface. Zero sizes (minimized windows) are recorded
    /// but not applied to the surface.
    fn set_size(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        if let Some(presentation) = &mut self.presentation {
            if size.width > 0 && size.height > 0 {
                presentation.config.width = size.width;
                presentation.config.height = size.height;
                presentation.surface.configure(&self.device, &presentation.config);
            }
        }
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn detach(&mut self) {
        if self.presentation.take().is_some() {
            tracing::debug!("gpu stage detached from window");
        }
    }

    fn destroy(&mut self) {
        self.detach();
        self.layers.clear();
        self.device.destroy();
    }
}

impl fmt::Debug for GpuStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuStage")
            .field("adapter", &self.adapter.get_info().name)
            .field("layers", &self.layers.as_slice().len())
            .field("size", &self.size)
            .field("attached", &self.is_attached())
            .finish()
    }
}
