//! Color attachment readback and PNG export

use crate::context::{GpuContext, RenderError};
use shutter_core::{PixelFormat, Result, ShutterError};
use std::path::Path;

/// Order of rows in a readback buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// First row is the top of the image
    TopDown,
    /// First row is the bottom of the image (OpenGL convention)
    BottomUp,
}

/// Tightly packed RGBA8 pixels read from a render target
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPixels {
    pub width: u32,
    pub height: u32,
    /// Internal format reported by the target, which decides how many
    /// channels are kept on export
    pub internal_format: PixelFormat,
    pub row_order: RowOrder,
    pub rgba: Vec<u8>,
}

impl TargetPixels {
    /// Solid-color image
    pub fn filled(width: u32, height: u32, internal_format: PixelFormat, rgba: [u8; 4]) -> Self {
        let rgba = rgba.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            internal_format,
            row_order: RowOrder::TopDown,
            rgba,
        }
    }

    /// Rows ordered top-down
    pub fn into_top_down(mut self) -> Self {
        if self.row_order == RowOrder::BottomUp {
            flip_rows(&mut self.rgba, self.width as usize * 4);
            self.row_order = RowOrder::TopDown;
        }
        self
    }

    /// Top-down pixels with the channel count of the internal format
    pub fn to_export_bytes(&self) -> (u8, Vec<u8>) {
        let channels = self.internal_format.channels();
        let top_down = self.clone().into_top_down();
        let bytes = match channels {
            4 => top_down.rgba,
            _ => top_down
                .rgba
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
        };
        (channels, bytes)
    }

    /// Encode as PNG at `path`
    pub fn write_png(&self, path: &Path) -> Result<()> {
        let (channels, bytes) = self.to_export_bytes();
        let color_type = if channels == 4 {
            image::ExtendedColorType::Rgba8
        } else {
            image::ExtendedColorType::Rgb8
        };
        image::save_buffer(path, &bytes, self.width, self.height, color_type)
            .map_err(|e| ShutterError::ImageWriteError(format!("{}: {}", path.display(), e)))
    }
}

/// Reverse the row order of a packed image in place
pub fn flip_rows(data: &mut [u8], row_bytes: usize) {
    if row_bytes == 0 {
        return;
    }
    let rows = data.len() / row_bytes;
    for row in 0..rows / 2 {
        let (top, bottom) = data.split_at_mut((rows - 1 - row) * row_bytes);
        top[row * row_bytes..(row + 1) * row_bytes].swap_with_slice(&mut bottom[..row_bytes]);
    }
}

/// Copy an RGBA8 texture into tightly packed CPU memory
pub fn read_texture_rgba(
    gpu: &GpuContext,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> std::result::Result<Vec<u8>, RenderError> {
    let bytes_per_pixel = 4u32;
    let unpadded_bytes_per_row = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let staging_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Pixel Readback Buffer"),
        size: (padded_bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging_buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device.poll(wgpu::Maintain::Wait);

    rx.recv()
        .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?
        .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?;

    let data = buffer_slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
    for row in 0..height {
        let start = (row * padded_bytes_per_row) as usize;
        pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
    }
    drop(data);
    staging_buffer.unmap();

    Ok(pixels)
}
