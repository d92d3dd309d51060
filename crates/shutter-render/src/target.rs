//! Offscreen render target (color + depth/stencil)

use crate::context::{create_depth_texture, GpuContext, OFFSCREEN_FORMAT};
use crate::resources::GpuSlot;
use shutter_core::{PixelFormat, Result, ShutterError};

struct Attachment {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Color and depth attachments sized to the session viewport. Allocated once
/// and reused for every camera of a run.
pub struct OffscreenTarget {
    color: GpuSlot<Attachment>,
    depth: GpuSlot<Attachment>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Default for OffscreenTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl OffscreenTarget {
    pub fn new() -> Self {
        Self {
            color: GpuSlot::new("offscreen color attachment"),
            depth: GpuSlot::new("offscreen depth attachment"),
            width: 0,
            height: 0,
            format: PixelFormat::Rgb8,
        }
    }

    /// Allocate the attachments, or reuse existing ones of the same size
    pub fn setup(&mut self, gpu: &GpuContext, width: u32, height: u32, format: PixelFormat) -> Result<()> {
        if self.color.is_allocated() && self.width == width && self.height == height {
            log::debug!("Reusing offscreen target {}x{}", width, height);
            self.format = format;
            return self.check_complete();
        }
        if self.color.is_allocated() || self.depth.is_allocated() {
            log::debug!("Offscreen target size changed, reallocating");
            self.release();
        }

        self.width = width;
        self.height = height;
        self.format = format;

        if width > 0 && height > 0 {
            let device = &gpu.device;
            self.color.allocate_with(|| {
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Offscreen Color"),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: OFFSCREEN_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                });
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                Attachment { texture, view }
            })?;
            self.depth.allocate_with(|| {
                let texture = create_depth_texture(device, width, height, "Offscreen Depth Stencil");
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                Attachment { texture, view }
            })?;
        }

        self.check_complete()
    }

    /// Both attachments present with matching non-zero size
    pub fn check_complete(&self) -> Result<()> {
        let (Some(color), Some(depth)) = (self.color.get(), self.depth.get()) else {
            return Err(ShutterError::IncompleteTarget(format!(
                "missing attachment for {}x{} target",
                self.width, self.height
            )));
        };
        if self.width == 0 || self.height == 0 {
            return Err(ShutterError::IncompleteTarget("zero-sized target".into()));
        }
        if color.texture.size() != depth.texture.size() {
            return Err(ShutterError::IncompleteTarget(format!(
                "color {:?} and depth {:?} sizes differ",
                color.texture.size(),
                depth.texture.size()
            )));
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.check_complete().is_ok()
    }

    pub fn color_texture(&self) -> Option<&wgpu::Texture> {
        self.color.get().map(|a| &a.texture)
    }

    pub fn color_view(&self) -> Option<&wgpu::TextureView> {
        self.color.get().map(|a| &a.view)
    }

    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth.get().map(|a| &a.view)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Internal format the target reports for readback
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn allocated_handles(&self) -> usize {
        self.color.count() + self.depth.count()
    }

    pub fn release(&mut self) {
        self.color.release();
        self.depth.release();
    }
}
