//! Import result types and mesh assembly

use shutter_core::{MeshData, Result, ShaderVariant, ShutterError, TextureImage};

/// Raw geometry of one triangle primitive, already in world space
#[derive(Debug, Clone, Default)]
pub struct ImportedPrimitive {
    pub positions: Vec<[f32; 3]>,
    /// Empty when the source had no normals
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub material_index: Option<usize>,
}

/// The subset of a PBR material the mesh provider uses
#[derive(Debug, Clone)]
pub struct ImportedMaterial {
    pub base_color: [f32; 4],
    /// Index into `ImportResult::images`
    pub base_color_image: Option<usize>,
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            base_color: [1.0; 4],
            base_color_image: None,
        }
    }
}

/// Result of reading a glTF file
#[derive(Debug, Default)]
pub struct ImportResult {
    pub primitives: Vec<ImportedPrimitive>,
    pub materials: Vec<ImportedMaterial>,
    /// Decoded images, converted to RGB8
    pub images: Vec<TextureImage>,
}

impl ImportResult {
    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.positions.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(|p| p.indices.len() / 3).sum()
    }

    fn material(&self, index: Option<usize>) -> ImportedMaterial {
        index
            .and_then(|i| self.materials.get(i))
            .cloned()
            .unwrap_or_default()
    }

    /// Base color texture of the first primitive whose material has one
    fn base_color_texture(&self) -> Option<&TextureImage> {
        self.primitives
            .iter()
            .filter_map(|p| self.material(p.material_index).base_color_image)
            .find_map(|i| self.images.get(i))
    }

    /// Merge all primitives into one normalized mesh carrying the channel
    /// `variant` needs.
    ///
    /// Missing normals are replaced by flat normals. A Textured request on a
    /// source without UVs leaves the uv channel empty so packing reports it.
    pub fn into_mesh(self, variant: ShaderVariant) -> Result<MeshData> {
        if self.triangle_count() == 0 {
            return Err(ShutterError::ImportError("no triangle geometry found".into()));
        }

        let all_normals = self.primitives.iter().all(|p| p.normals.len() == p.positions.len());
        let all_uvs = self.primitives.iter().all(|p| p.uvs.len() == p.positions.len());

        let mut mesh = MeshData::default();
        let mut uvs = Vec::new();
        let mut colors = Vec::new();
        for primitive in &self.primitives {
            let base = mesh.positions.len() as u32;
            mesh.positions.extend_from_slice(&primitive.positions);
            if all_normals {
                mesh.normals.extend_from_slice(&primitive.normals);
            }
            if all_uvs {
                uvs.extend_from_slice(&primitive.uvs);
            }
            if primitive.colors.len() == primitive.positions.len() {
                colors.extend_from_slice(&primitive.colors);
            } else {
                let [r, g, b, _] = self.material(primitive.material_index).base_color;
                colors.extend(std::iter::repeat([r, g, b]).take(primitive.positions.len()));
            }
            mesh.indices.extend(primitive.indices.iter().map(|i| i + base));
        }

        mesh.normalize();

        match variant {
            ShaderVariant::Textured if all_uvs => {
                let texture = match self.base_color_texture() {
                    Some(texture) => texture.clone(),
                    None => {
                        let [r, g, b, _] = self.material(self.primitives[0].material_index).base_color;
                        log::warn!("No base color texture, using a 1x1 texture of the base color");
                        TextureImage::new(1, 1, vec![to_u8(r), to_u8(g), to_u8(b)])
                    }
                };
                mesh = mesh.with_uv(uvs, texture);
            }
            ShaderVariant::Textured => {
                log::warn!("Source has no texture coordinates on every primitive");
            }
            ShaderVariant::Flat => mesh = mesh.with_colors(colors),
            _ => {}
        }

        if !all_normals {
            log::debug!("Generating flat normals");
            mesh.compute_flat_normals();
        }

        if variant == ShaderVariant::FaceIndex {
            mesh = mesh.with_generated_face_ids();
        }

        mesh.validate()?;
        log::info!(
            "Assembled mesh: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.face_count()
        );
        Ok(mesh)
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
