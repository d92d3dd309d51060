//! glTF/GLB file importer

use crate::types::{ImportResult, ImportedMaterial, ImportedPrimitive};
use glam::{Mat3, Mat4, Vec3};
use image::{DynamicImage, ImageBuffer};
use shutter_core::{MeshData, Result, ShaderVariant, ShutterError, TextureImage};
use std::path::Path;

/// Load a glTF or GLB file as one normalized mesh for `variant`
pub fn import_gltf<P: AsRef<Path>>(path: P, variant: ShaderVariant) -> Result<MeshData> {
    let path = path.as_ref();
    let result = read_gltf(path)?;
    log::info!(
        "Imported {}: {} primitives, {} vertices, {} images",
        path.display(),
        result.primitives.len(),
        result.vertex_count(),
        result.images.len()
    );
    result.into_mesh(variant)
}

/// Read every triangle primitive of the default scene in world space
pub fn read_gltf<P: AsRef<Path>>(path: P) -> Result<ImportResult> {
    let path = path.as_ref();
    let (document, buffers, images) = gltf::import(path)
        .map_err(|e| ShutterError::ImportError(format!("Failed to import glTF: {}", e)))?;

    let mut primitives = Vec::new();
    let scene = document.default_scene().or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut primitives);
            }
        }
        None => {
            // No scene graph: take meshes as authored
            for mesh in document.meshes() {
                collect_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut primitives);
            }
        }
    }

    let materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            ImportedMaterial {
                base_color: pbr.base_color_factor(),
                base_color_image: pbr
                    .base_color_texture()
                    .map(|info| info.texture().source().index()),
            }
        })
        .collect();

    let images = images
        .into_iter()
        .enumerate()
        .filter_map(|(i, data)| match convert_image(data) {
            Some(image) => Some(image),
            None => {
                log::warn!("Skipping image {}: could not convert to RGB8", i);
                None
            }
        })
        .collect();

    Ok(ImportResult {
        primitives,
        materials,
        images,
    })
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ImportedPrimitive>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, buffers, out);
    }
    for child in node.children() {
        collect_node(&child, world, buffers, out);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh,
    transform: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ImportedPrimitive>,
) {
    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping primitive {} of mesh {}: mode {:?} is not a triangle list",
                primitive.index(),
                mesh.index(),
                primitive.mode()
            );
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .map(|iter| {
                iter.map(|p| transform.transform_point3(Vec3::from_array(p)).to_array())
                    .collect()
            })
            .unwrap_or_default();

        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|iter| {
                iter.map(|n| (normal_matrix * Vec3::from_array(n)).normalize_or_zero().to_array())
                    .collect()
            })
            .unwrap_or_default();

        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|iter| iter.into_f32().collect())
            .unwrap_or_default();

        let colors: Vec<[f32; 3]> = reader
            .read_colors(0)
            .map(|iter| iter.into_rgb_f32().collect())
            .unwrap_or_default();

        let indices: Vec<u32> = reader
            .read_indices()
            .map(|iter| iter.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());

        out.push(ImportedPrimitive {
            positions,
            normals,
            uvs,
            colors,
            indices,
            material_index: primitive.material().index(),
        });
    }
}

/// Convert any glTF pixel format to tightly packed RGB8
fn convert_image(data: gltf::image::Data) -> Option<TextureImage> {
    use gltf::image::Format;

    let (w, h) = (data.width, data.height);
    let pixels = data.pixels;
    let u16s = |bytes: &[u8]| -> Vec<u16> {
        bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect()
    };
    let f32s = |bytes: &[u8]| -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    };

    let image = match data.format {
        Format::R8 => DynamicImage::ImageLuma8(ImageBuffer::from_raw(w, h, pixels)?),
        Format::R8G8 => DynamicImage::ImageLumaA8(ImageBuffer::from_raw(w, h, pixels)?),
        Format::R8G8B8 => DynamicImage::ImageRgb8(ImageBuffer::from_raw(w, h, pixels)?),
        Format::R8G8B8A8 => DynamicImage::ImageRgba8(ImageBuffer::from_raw(w, h, pixels)?),
        Format::R16 => DynamicImage::ImageLuma16(ImageBuffer::from_raw(w, h, u16s(&pixels))?),
        Format::R16G16 => DynamicImage::ImageLumaA16(ImageBuffer::from_raw(w, h, u16s(&pixels))?),
        Format::R16G16B16 => DynamicImage::ImageRgb16(ImageBuffer::from_raw(w, h, u16s(&pixels))?),
        Format::R16G16B16A16 => {
            DynamicImage::ImageRgba16(ImageBuffer::from_raw(w, h, u16s(&pixels))?)
        }
        Format::R32G32B32FLOAT => {
            DynamicImage::ImageRgb32F(ImageBuffer::from_raw(w, h, f32s(&pixels))?)
        }
        Format::R32G32B32A32FLOAT => {
            DynamicImage::ImageRgba32F(ImageBuffer::from_raw(w, h, f32s(&pixels))?)
        }
    };

    Some(TextureImage::new(w, h, image.to_rgb8().into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // One triangle (0,0,0) (2,0,0) (0,1,0) with u16 indices and UVs, no normals
    const TRIANGLE_BUFFER: &str =
        "AAAAAAAAAAAAAAAAAAAAQAAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAgD8=";

    fn triangle_gltf() -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "mesh": 0, "translation": [5.0, 0.0, 0.0] }}],
  "meshes": [{{ "primitives": [{{
    "attributes": {{ "POSITION": 0, "TEXCOORD_0": 2 }},
    "indices": 1,
    "material": 0
  }}] }}],
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0] }} }}],
  "buffers": [{{ "byteLength": 68, "uri": "data:application/octet-stream;base64,{}" }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }},
    {{ "buffer": 0, "byteOffset": 44, "byteLength": 24 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0.0, 0.0, 0.0], "max": [2.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }},
    {{ "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" }}
  ]
}}"#,
            TRIANGLE_BUFFER
        )
    }

    fn write_triangle() -> (std::path::PathBuf, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("shutter_import_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, triangle_gltf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_applies_node_transform() {
        let (dir, path) = write_triangle();
        let result = read_gltf(&path).unwrap();
        assert_eq!(result.primitives.len(), 1);
        assert_eq!(result.primitives[0].positions[1], [7.0, 0.0, 0.0]);
        assert!(result.primitives[0].normals.is_empty());
        assert_eq!(result.materials[0].base_color, [1.0, 0.0, 0.0, 1.0]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_import_flat_normalizes_and_colors() {
        let (dir, path) = write_triangle();
        let mesh = import_gltf(&path, ShaderVariant::Flat).unwrap();
        let (min, max) = mesh.bounds().unwrap();
        assert!((min[0] + 0.5).abs() < 1e-6 && (max[0] - 0.5).abs() < 1e-6);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
        assert_eq!(mesh.colors.as_ref().unwrap()[0], [1.0, 0.0, 0.0]);
        assert!(mesh.pack(ShaderVariant::Flat).is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_import_textured_has_uvs() {
        let (dir, path) = write_triangle();
        let mesh = import_gltf(&path, ShaderVariant::Textured).unwrap();
        let uv = mesh.uv.as_ref().unwrap();
        assert_eq!(uv.uvs[1], [1.0, 0.0]);
        assert_eq!(uv.texture.pixels, vec![255, 0, 0]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_import_error() {
        let path = std::env::temp_dir().join(format!("shutter_missing_{}.glb", uuid::Uuid::new_v4()));
        assert!(matches!(
            import_gltf(&path, ShaderVariant::Default),
            Err(ShutterError::ImportError(_))
        ));
    }

    #[test]
    fn test_convert_rgba_drops_alpha() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40],
            format: gltf::image::Format::R8G8B8A8,
            width: 1,
            height: 1,
        };
        let image = convert_image(data).unwrap();
        assert_eq!(image.pixels, vec![10, 20, 30]);
    }

    #[test]
    fn test_convert_luma16_takes_high_byte() {
        let data = gltf::image::Data {
            pixels: 0xFFFFu16.to_le_bytes().to_vec(),
            format: gltf::image::Format::R16,
            width: 1,
            height: 1,
        };
        assert_eq!(convert_image(data).unwrap().pixels, vec![255, 255, 255]);
    }
}
