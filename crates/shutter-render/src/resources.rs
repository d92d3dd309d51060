//! GPU object handles and their allocate/release lifecycle

use crate::context::GpuContext;
use crate::uniforms::UNIFORM_BLOCK_SIZE;
use shutter_core::{PackedMesh, Result, ShutterError, VertexLayout};
use wgpu::util::DeviceExt;

/// Holder for one GPU object. The empty state plays the role of the zero
/// handle: allocating into an occupied slot is refused and the first handle
/// is kept.
#[derive(Debug)]
pub struct GpuSlot<T> {
    name: &'static str,
    handle: Option<T>,
}

impl<T> GpuSlot<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_allocated(&self) -> bool {
        self.handle.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.handle.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.handle.as_mut()
    }

    /// Store the handle produced by `create`, which only runs when the slot
    /// is empty
    pub fn allocate_with(&mut self, create: impl FnOnce() -> T) -> Result<&T> {
        if self.handle.is_some() {
            log::error!("GPU {} was already allocated; keeping the existing handle", self.name);
            return Err(ShutterError::AlreadyAllocated(self.name));
        }
        let handle: &T = self.handle.insert(create());
        Ok(handle)
    }

    pub fn allocate(&mut self, handle: T) -> Result<&T> {
        self.allocate_with(|| handle)
    }

    /// Drop the handle. Safe to call on an empty slot.
    pub fn release(&mut self) -> bool {
        self.handle.take().is_some()
    }

    /// 1 if allocated, else 0
    pub fn count(&self) -> usize {
        usize::from(self.is_allocated())
    }
}

/// Bind group layout, pipeline layout, sampler, and fallback texture shared
/// by every program
pub struct SharedBindings {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub sampler: wgpu::Sampler,
    pub white_view: wgpu::TextureView,
}

impl SharedBindings {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shutter Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE as u64),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shutter Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let address_mode = if gpu.supports_clamp_to_border() {
            wgpu::AddressMode::ClampToBorder
        } else {
            log::warn!("Adapter lacks clamp-to-border sampling, using clamp-to-edge");
            wgpu::AddressMode::ClampToEdge
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Object Texture Sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            border_color: (address_mode == wgpu::AddressMode::ClampToBorder)
                .then_some(wgpu::SamplerBorderColor::OpaqueWhite),
            ..Default::default()
        });

        let white = create_rgba_texture(gpu, 1, 1, &[255, 255, 255, 255], "Fallback Texture");
        let white_view = white.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            bind_group_layout,
            pipeline_layout,
            sampler,
            white_view,
        }
    }

    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        uniforms: &wgpu::Buffer,
        texture: Option<&wgpu::TextureView>,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: uniforms,
                        offset: 0,
                        size: wgpu::BufferSize::new(UNIFORM_BLOCK_SIZE as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture.unwrap_or(&self.white_view)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

fn create_rgba_texture(gpu: &GpuContext, width: u32, height: u32, rgba: &[u8], label: &str) -> wgpu::Texture {
    gpu.device.create_texture_with_data(
        &gpu.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        rgba,
    )
}

/// Uploaded texture with its view
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Vertex/index buffers and optional texture of one drawable object
pub struct MeshBuffers {
    pub vertex: GpuSlot<wgpu::Buffer>,
    pub index: GpuSlot<wgpu::Buffer>,
    pub texture: GpuSlot<GpuTexture>,
    layout: Option<VertexLayout>,
    draw_count: u32,
}

impl Default for MeshBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshBuffers {
    pub fn new() -> Self {
        Self {
            vertex: GpuSlot::new("vertex buffer"),
            index: GpuSlot::new("index buffer"),
            texture: GpuSlot::new("object texture"),
            layout: None,
            draw_count: 0,
        }
    }

    /// Allocate every handle `packed` needs. Occupied slots are rejected
    /// before any GPU object is created for them.
    pub fn upload(&mut self, gpu: &GpuContext, packed: &PackedMesh<'_>) -> Result<()> {
        let device = &gpu.device;

        self.vertex.allocate_with(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Object Vertex Buffer"),
                contents: &packed.vertices,
                usage: wgpu::BufferUsages::VERTEX,
            })
        })?;

        if let Some(indices) = &packed.indices {
            self.index.allocate_with(|| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Object Index Buffer"),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
            })?;
        }

        if let Some(image) = packed.texture {
            self.texture.allocate_with(|| {
                let texture = create_rgba_texture(gpu, image.width, image.height, &image.to_rgba(), "Object Texture");
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                GpuTexture { texture, view }
            })?;
        }

        self.layout = Some(packed.layout);
        self.draw_count = packed.draw_count();
        log::debug!(
            "Uploaded {} vertices ({} bytes), draw count {}",
            packed.vertex_count,
            packed.vertices.len(),
            self.draw_count
        );
        Ok(())
    }

    pub fn layout(&self) -> Option<VertexLayout> {
        self.layout
    }

    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    pub fn texture_view(&self) -> Option<&wgpu::TextureView> {
        self.texture.get().map(|t| &t.view)
    }

    pub fn allocated_handles(&self) -> usize {
        self.vertex.count() + self.index.count() + self.texture.count()
    }

    pub fn release(&mut self) {
        self.vertex.release();
        self.index.release();
        self.texture.release();
        self.layout = None;
        self.draw_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_allocation_keeps_first_handle() {
        let mut slot = GpuSlot::new("vertex buffer");
        assert_eq!(*slot.allocate(1u32).unwrap(), 1);

        let mut created = false;
        let result = slot.allocate_with(|| {
            created = true;
            2
        });
        assert!(matches!(result, Err(ShutterError::AlreadyAllocated("vertex buffer"))));
        assert!(!created);
        assert_eq!(slot.get(), Some(&1));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut slot: GpuSlot<u32> = GpuSlot::new("texture");
        assert!(!slot.release());
        slot.allocate(5).unwrap();
        assert_eq!(slot.count(), 1);
        assert!(slot.release());
        assert!(!slot.release());
        assert_eq!(slot.count(), 0);
        assert!(slot.allocate(6).is_ok());
    }
}
