//! wgpu device setup, headless or window-backed

use shutter_core::ShutterError;
use std::sync::Arc;
use thiserror::Error;
use winit::window::Window;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    SurfaceCreation(String),
    #[error("Failed to get adapter")]
    AdapterNotFound,
    #[error("Failed to create device: {0}")]
    DeviceCreation(String),
    #[error("Surface error: {0}")]
    SurfaceError(String),
    #[error("Failed to read render buffer: {0}")]
    BufferReadFailed(String),
}

impl From<RenderError> for ShutterError {
    fn from(err: RenderError) -> Self {
        ShutterError::RenderError(err.to_string())
    }
}

/// Format of the offscreen color attachment. Unorm (not sRGB) so face ids and
/// flat colors survive readback unchanged.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Window surface plus its depth buffer
pub struct SurfaceState {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    pub depth_view: wgpu::TextureView,
}

/// Device, queue, and optionally a window surface
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub features: wgpu::Features,
    pub surface: Option<SurfaceState>,
}

impl GpuContext {
    /// Context without a window, for offscreen export
    pub async fn headless() -> Result<Self, RenderError> {
        let instance = create_instance();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::AdapterNotFound)?;

        let (device, queue, features) = request_device(&adapter, "Shutter Headless Device").await?;
        Ok(Self {
            device,
            queue,
            features,
            surface: None,
        })
    }

    /// Context presenting to `window`
    pub async fn for_window(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = create_instance();

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::SurfaceCreation(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::AdapterNotFound)?;

        let (device, queue, features) = request_device(&adapter, "Shutter Device").await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::SurfaceCreation("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height, "Surface Depth");

        Ok(Self {
            device,
            queue,
            features,
            surface: Some(SurfaceState {
                surface,
                config,
                depth_view,
            }),
        })
    }

    /// Formats every program must be able to render into
    pub fn target_formats(&self) -> Vec<wgpu::TextureFormat> {
        let mut formats = vec![OFFSCREEN_FORMAT];
        if let Some(surface) = &self.surface {
            if surface.config.format != OFFSCREEN_FORMAT {
                formats.push(surface.config.format);
            }
        }
        formats
    }

    /// Reconfigure the surface after a window resize
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Some(state) = &mut self.surface {
            state.config.width = width;
            state.config.height = height;
            state.surface.configure(&self.device, &state.config);
            state.depth_view = create_depth_view(&self.device, width, height, "Surface Depth");
        }
    }

    pub fn supports_clamp_to_border(&self) -> bool {
        self.features.contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER)
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_device(
    adapter: &wgpu::Adapter,
    label: &str,
) -> Result<(wgpu::Device, wgpu::Queue, wgpu::Features), RenderError> {
    let info = adapter.get_info();
    log::info!("Using adapter {} ({:?})", info.name, info.backend);

    // Border clamping is optional; sampling falls back to clamp-to-edge
    let features = adapter.features() & wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: features,
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .map_err(|e| RenderError::DeviceCreation(e.to_string()))?;

    Ok((device, queue, features))
}

pub(crate) fn create_depth_view(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    label: &str,
) -> wgpu::TextureView {
    create_depth_texture(device, width, height, label).create_view(&wgpu::TextureViewDescriptor::default())
}

pub(crate) fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}
