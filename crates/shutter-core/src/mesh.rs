//! Mesh provider contract and variant-specific vertex packing
//!
//! A [`MeshData`] carries positions, normals and a triangle index list, plus
//! whichever optional channel (uv + texture, face ids, colors) the active
//! shader variant needs. [`MeshData::pack`] turns it into the exact vertex
//! bytes the variant's layout expects, refusing meshes that lack the channel.

use crate::error::{Result, ShutterError};
use crate::variant::{DrawMode, ShaderVariant, VertexLayout};
use bytemuck::{Pod, Zeroable};

/// Position only
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PlainVertex {
    pub position: [f32; 3],
}

/// Position and normal
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct NormalVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Position, normal and texture coordinates
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Position, normal and an RGB-encoded face index
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FaceIdVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub face_id: [f32; 3],
}

/// Position, normal and a flat color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Tightly packed 8-bit RGB image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Expand to RGBA8 with opaque alpha
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixels.len() / 3 * 4);
        for px in self.pixels.chunks_exact(3) {
            rgba.extend_from_slice(px);
            rgba.push(255);
        }
        rgba
    }

    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Per-vertex UVs plus the image they sample
#[derive(Debug, Clone, PartialEq)]
pub struct UvChannel {
    pub uvs: Vec<[f32; 2]>,
    pub texture: TextureImage,
}

/// One mesh with optional variant-specific channels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Triangle list
    pub indices: Vec<u32>,
    pub uv: Option<UvChannel>,
    pub face_ids: Option<Vec<[f32; 3]>>,
    pub colors: Option<Vec<[f32; 3]>>,
}

/// GPU-ready vertex data for one variant
#[derive(Debug, Clone)]
pub struct PackedMesh<'a> {
    pub layout: VertexLayout,
    pub vertices: Vec<u8>,
    pub vertex_count: u32,
    /// Present only for indexed layouts
    pub indices: Option<Vec<u32>>,
    /// Present only for the textured layout
    pub texture: Option<&'a TextureImage>,
}

impl PackedMesh<'_> {
    /// Number of vertices a draw call submits
    pub fn draw_count(&self) -> u32 {
        match &self.indices {
            Some(indices) => indices.len() as u32,
            None => self.vertex_count,
        }
    }
}

impl MeshData {
    pub fn new(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals,
            indices,
            ..Default::default()
        }
    }

    pub fn with_uv(mut self, uvs: Vec<[f32; 2]>, texture: TextureImage) -> Self {
        self.uv = Some(UvChannel { uvs, texture });
        self
    }

    pub fn with_face_ids(mut self, face_ids: Vec<[f32; 3]>) -> Self {
        self.face_ids = Some(face_ids);
        self
    }

    pub fn with_colors(mut self, colors: Vec<[f32; 3]>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Name of the channel `variant` needs but this mesh lacks, if any
    pub fn missing_channel(&self, variant: ShaderVariant) -> Option<&'static str> {
        let needs_normals = variant != ShaderVariant::Default;
        if needs_normals && self.normals.len() != self.positions.len() {
            return Some("normals");
        }
        match variant {
            ShaderVariant::Textured if self.uv.is_none() => Some("uv"),
            ShaderVariant::FaceIndex if self.face_ids.is_none() => Some("face ids"),
            ShaderVariant::Flat if self.colors.is_none() => Some("colors"),
            _ => None,
        }
    }

    /// Structural checks independent of the variant
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(ShutterError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let n = self.positions.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(ShutterError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad, n
            )));
        }
        if let Some(uv) = &self.uv {
            if uv.uvs.len() != n {
                return Err(ShutterError::InvalidMesh("uv count differs from vertex count".into()));
            }
            if uv.texture.pixels.len() != uv.texture.expected_len() {
                return Err(ShutterError::InvalidMesh(format!(
                    "texture is {}x{} but has {} bytes",
                    uv.texture.width,
                    uv.texture.height,
                    uv.texture.pixels.len()
                )));
            }
        }
        if self.face_ids.as_ref().is_some_and(|f| f.len() != n) {
            return Err(ShutterError::InvalidMesh("face id count differs from vertex count".into()));
        }
        if self.colors.as_ref().is_some_and(|c| c.len() != n) {
            return Err(ShutterError::InvalidMesh("color count differs from vertex count".into()));
        }
        Ok(())
    }

    /// Pack vertices for `variant`.
    ///
    /// The layout check runs before anything reads the optional channels, so
    /// a Textured request on a mesh without UVs fails here rather than during
    /// buffer upload.
    pub fn pack(&self, variant: ShaderVariant) -> Result<PackedMesh<'_>> {
        if let Some(missing) = self.missing_channel(variant) {
            log::error!(
                "Mesh layout does not match shader variant '{}': missing {}",
                variant,
                missing
            );
            return Err(ShutterError::LayoutMismatch { variant, missing });
        }
        self.validate()?;

        let layout = variant.layout();
        // Arrays layouts get one vertex per triangle corner
        let corners: Vec<usize> = match layout.draw {
            DrawMode::Indexed => (0..self.positions.len()).collect(),
            DrawMode::Arrays => self.indices.iter().map(|&i| i as usize).collect(),
        };

        let vertices: Vec<u8> = match variant {
            ShaderVariant::Default => {
                let v: Vec<PlainVertex> = corners
                    .iter()
                    .map(|&i| PlainVertex {
                        position: self.positions[i],
                    })
                    .collect();
                bytemuck::cast_slice(&v).to_vec()
            }
            ShaderVariant::NoTexture => {
                let v: Vec<NormalVertex> = corners
                    .iter()
                    .map(|&i| NormalVertex {
                        position: self.positions[i],
                        normal: self.normals[i],
                    })
                    .collect();
                bytemuck::cast_slice(&v).to_vec()
            }
            ShaderVariant::Textured => {
                let uvs = self.uv.as_ref().map(|uv| uv.uvs.as_slice()).unwrap_or_default();
                let v: Vec<TexturedVertex> = corners
                    .iter()
                    .map(|&i| TexturedVertex {
                        position: self.positions[i],
                        normal: self.normals[i],
                        uv: uvs[i],
                    })
                    .collect();
                bytemuck::cast_slice(&v).to_vec()
            }
            ShaderVariant::FaceIndex => {
                let ids = self.face_ids.as_deref().unwrap_or_default();
                let v: Vec<FaceIdVertex> = corners
                    .iter()
                    .map(|&i| FaceIdVertex {
                        position: self.positions[i],
                        normal: self.normals[i],
                        face_id: ids[i],
                    })
                    .collect();
                bytemuck::cast_slice(&v).to_vec()
            }
            ShaderVariant::Flat => {
                let colors = self.colors.as_deref().unwrap_or_default();
                let v: Vec<ColorVertex> = corners
                    .iter()
                    .map(|&i| ColorVertex {
                        position: self.positions[i],
                        normal: self.normals[i],
                        color: colors[i],
                    })
                    .collect();
                bytemuck::cast_slice(&v).to_vec()
            }
        };

        let indices = match layout.draw {
            DrawMode::Indexed => Some(self.indices.clone()),
            DrawMode::Arrays => None,
        };

        Ok(PackedMesh {
            layout,
            vertices,
            vertex_count: corners.len() as u32,
            indices,
            texture: self.uv.as_ref().filter(|_| variant == ShaderVariant::Textured).map(|uv| &uv.texture),
        })
    }

    /// Axis-aligned bounds `(min, max)`, or `None` for an empty mesh
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.positions[1..] {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }

    /// Center the bounding box on the origin and scale the longest edge to 1
    pub fn normalize(&mut self) {
        let Some((min, max)) = self.bounds() else {
            return;
        };
        let center = [
            (min[0] + max[0]) * 0.5,
            (min[1] + max[1]) * 0.5,
            (min[2] + max[2]) * 0.5,
        ];
        let extent = (max[0] - min[0]).max(max[1] - min[1]).max(max[2] - min[2]);
        let scale = if extent > f32::EPSILON { 1.0 / extent } else { 1.0 };
        for p in &mut self.positions {
            for axis in 0..3 {
                p[axis] = (p[axis] - center[axis]) * scale;
            }
        }
    }

    /// Replace normals with per-face normals, un-sharing every corner
    pub fn compute_flat_normals(&mut self) {
        *self = self.unshared();
        self.normals = vec![[0.0; 3]; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let n = face_normal(
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            );
            for &i in tri {
                self.normals[i as usize] = n;
            }
        }
    }

    /// Give every face its own three vertices and attach encoded face ids
    pub fn with_generated_face_ids(&self) -> Self {
        let mut mesh = self.unshared();
        let ids = (0..mesh.positions.len())
            .map(|v| encode_face_id((v / 3) as u32))
            .collect();
        mesh.face_ids = Some(ids);
        mesh
    }

    /// Copy with one vertex per triangle corner and indices `0..n`
    pub fn unshared(&self) -> Self {
        let pick3 = |src: &[[f32; 3]]| -> Vec<[f32; 3]> {
            self.indices.iter().map(|&i| src[i as usize]).collect()
        };
        let normals = if self.normals.len() == self.positions.len() {
            pick3(&self.normals)
        } else {
            Vec::new()
        };
        Self {
            positions: pick3(&self.positions),
            normals,
            indices: (0..self.indices.len() as u32).collect(),
            uv: self.uv.as_ref().map(|uv| UvChannel {
                uvs: self.indices.iter().map(|&i| uv.uvs[i as usize]).collect(),
                texture: uv.texture.clone(),
            }),
            face_ids: self.face_ids.as_deref().map(pick3),
            colors: self.colors.as_deref().map(pick3),
        }
    }

    /// Unit cube centered at the origin with outward per-face normals
    pub fn unit_cube() -> Self {
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]]),
            ([0.0, 0.0, -1.0], [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]]),
            ([-1.0, 0.0, 0.0], [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]]),
            ([1.0, 0.0, 0.0], [[0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5]]),
            ([0.0, -1.0, 0.0], [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]]),
            ([0.0, 1.0, 0.0], [[-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5]]),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = positions.len() as u32;
            for corner in corners {
                positions.push(corner);
                normals.push(normal);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(positions, normals, indices)
    }
}

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 1.0, 0.0]
    }
}

/// Encode a face index as an RGB color in [0, 1]. Id 0 is reserved for the
/// black background, so face `i` is stored as `i + 1` in 24 bits.
pub fn encode_face_id(face: u32) -> [f32; 3] {
    let v = face.wrapping_add(1) & 0x00FF_FFFF;
    [
        ((v >> 16) & 0xFF) as f32 / 255.0,
        ((v >> 8) & 0xFF) as f32 / 255.0,
        (v & 0xFF) as f32 / 255.0,
    ]
}

/// Decode an 8-bit RGB pixel written by the face-index variant
pub fn decode_face_id(rgb: [u8; 3]) -> Option<u32> {
    let v = ((rgb[0] as u32) << 16) | ((rgb[1] as u32) << 8) | rgb[2] as u32;
    v.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> TextureImage {
        TextureImage::new(2, 1, vec![255, 0, 0, 0, 255, 0])
    }

    #[test]
    fn test_textured_without_uv_is_rejected() {
        let mesh = MeshData::unit_cube();
        match mesh.pack(ShaderVariant::Textured) {
            Err(ShutterError::LayoutMismatch { variant, missing }) => {
                assert_eq!(variant, ShaderVariant::Textured);
                assert_eq!(missing, "uv");
            }
            other => panic!("expected layout mismatch, got {:?}", other.map(|p| p.vertex_count)),
        }
    }

    #[test]
    fn test_missing_channels_per_variant() {
        let mesh = MeshData::unit_cube();
        assert_eq!(mesh.missing_channel(ShaderVariant::Default), None);
        assert_eq!(mesh.missing_channel(ShaderVariant::NoTexture), None);
        assert_eq!(mesh.missing_channel(ShaderVariant::FaceIndex), Some("face ids"));
        assert_eq!(mesh.missing_channel(ShaderVariant::Flat), Some("colors"));

        let no_normals = MeshData::new(vec![[0.0; 3]; 3], vec![], vec![0, 1, 2]);
        assert_eq!(no_normals.missing_channel(ShaderVariant::Default), None);
        assert_eq!(no_normals.missing_channel(ShaderVariant::NoTexture), Some("normals"));
    }

    #[test]
    fn test_indexed_pack_keeps_shared_vertices() {
        let mesh = MeshData::unit_cube();
        let packed = mesh.pack(ShaderVariant::NoTexture).unwrap();
        assert_eq!(packed.vertex_count, 24);
        assert_eq!(packed.vertices.len(), 24 * 24);
        assert_eq!(packed.indices.as_ref().map(Vec::len), Some(36));
        assert_eq!(packed.draw_count(), 36);
        assert!(packed.texture.is_none());
    }

    #[test]
    fn test_arrays_pack_expands_corners() {
        let mesh = MeshData::unit_cube().with_colors(vec![[1.0, 0.0, 0.0]; 24]);
        let packed = mesh.pack(ShaderVariant::Flat).unwrap();
        assert!(packed.indices.is_none());
        assert_eq!(packed.vertex_count, 36);
        assert_eq!(packed.vertices.len(), 36 * 36);

        let verts: &[ColorVertex] = bytemuck::cast_slice(&packed.vertices);
        assert_eq!(verts[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(verts[5].position, mesh.positions[mesh.indices[5] as usize]);
    }

    #[test]
    fn test_textured_pack_carries_texture() {
        let mesh = MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0.0, 0.0, 1.0]; 3],
            vec![0, 1, 2],
        )
        .with_uv(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], checker());

        let packed = mesh.pack(ShaderVariant::Textured).unwrap();
        assert_eq!(packed.texture.map(|t| t.width), Some(2));
        let verts: &[TexturedVertex] = bytemuck::cast_slice(&packed.vertices);
        assert_eq!(verts[1].uv, [1.0, 0.0]);
    }

    #[test]
    fn test_validate_rejects_bad_indices() {
        let mesh = MeshData::new(vec![[0.0; 3]; 3], vec![[0.0; 3]; 3], vec![0, 1, 5]);
        assert!(matches!(mesh.validate(), Err(ShutterError::InvalidMesh(_))));

        let mesh = MeshData::new(vec![[0.0; 3]; 3], vec![[0.0; 3]; 3], vec![0, 1]);
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_texture() {
        let mesh = MeshData::new(vec![[0.0; 3]; 3], vec![[0.0; 3]; 3], vec![0, 1, 2])
            .with_uv(vec![[0.0; 2]; 3], TextureImage::new(4, 4, vec![0; 10]));
        assert!(mesh.pack(ShaderVariant::Textured).is_err());
    }

    #[test]
    fn test_face_id_roundtrip_known_values() {
        let c = encode_face_id(0);
        assert_eq!(c, [0.0, 0.0, 1.0 / 255.0]);
        assert_eq!(decode_face_id([0, 0, 1]), Some(0));
        assert_eq!(decode_face_id([0, 1, 0]), Some(255));
        assert_eq!(decode_face_id([0, 0, 0]), None);
    }

    #[test]
    fn test_generated_face_ids_are_per_face() {
        let mesh = MeshData::unit_cube().with_generated_face_ids();
        assert_eq!(mesh.positions.len(), 36);
        let ids = mesh.face_ids.as_ref().unwrap();
        assert_eq!(ids[0], ids[2]);
        assert_ne!(ids[2], ids[3]);
        assert!(mesh.pack(ShaderVariant::FaceIndex).is_ok());
    }

    #[test]
    fn test_normalize_fits_unit_box() {
        let mut mesh = MeshData::new(
            vec![[10.0, 0.0, 0.0], [14.0, 2.0, 1.0], [12.0, 1.0, 0.5]],
            vec![],
            vec![0, 1, 2],
        );
        mesh.normalize();
        let (min, max) = mesh.bounds().unwrap();
        assert!((max[0] - min[0] - 1.0).abs() < 1e-6);
        assert!((min[0] + 0.5).abs() < 1e-6);
        assert!((min[1] + max[1]).abs() < 1e-6);
    }

    #[test]
    fn test_flat_normals() {
        let mut mesh = MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![],
            vec![0, 1, 2],
        );
        mesh.compute_flat_normals();
        assert_eq!(mesh.normals, vec![[0.0, 0.0, 1.0]; 3]);
    }

    #[test]
    fn test_texture_to_rgba() {
        assert_eq!(checker().to_rgba(), vec![255, 0, 0, 255, 0, 255, 0, 255]);
    }
}
