//! CPU-side uniform block and the name → offset table
//!
//! Every program shares one WGSL `Uniforms` struct (see `shaders/prelude.wgsl`).
//! Uniform names resolve to a byte offset and kind here, playing the role of
//! a uniform location cache.

use glam::{Mat4, Vec3, Vec4};

/// Size of the WGSL `Uniforms` struct in bytes
pub const UNIFORM_BLOCK_SIZE: usize = 496;

/// Spacing of per-draw uniform slices in the dynamic-offset buffer
pub const UNIFORM_STRIDE: u32 = 512;

pub const POINT_LIGHT_COUNT: usize = 2;
const POINT_LIGHTS_BASE: usize = 368;
const POINT_LIGHT_STRIDE: usize = 64;

/// Type of a uniform slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat4,
}

/// A value pushed to a uniform slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    fn write(&self, dst: &mut [u8]) {
        match self {
            UniformValue::Int(v) => dst[..4].copy_from_slice(&v.to_le_bytes()),
            UniformValue::Float(v) => dst[..4].copy_from_slice(&v.to_le_bytes()),
            UniformValue::Vec3(v) => dst[..12].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => dst[..16].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Mat4(m) => dst[..64].copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
        }
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        UniformValue::Mat4(m)
    }
}

const FIXED_SLOTS: &[(&str, usize, UniformKind)] = &[
    ("model", 0, UniformKind::Mat4),
    ("normal_matrix", 64, UniformKind::Mat4),
    ("view", 128, UniformKind::Mat4),
    ("projection", 192, UniformKind::Mat4),
    ("eye_pos", 256, UniformKind::Vec3),
    ("Tex1", 268, UniformKind::Int),
    ("material.diffuse", 272, UniformKind::Vec3),
    ("material.shininess", 284, UniformKind::Float),
    ("material.specular", 288, UniformKind::Vec3),
    ("directional_light.direction", 304, UniformKind::Vec3),
    ("directional_light.ambient", 320, UniformKind::Vec3),
    ("directional_light.diffuse", 336, UniformKind::Vec3),
    ("directional_light.specular", 352, UniformKind::Vec3),
];

const POINT_LIGHT_FIELDS: &[(&str, usize, UniformKind)] = &[
    ("position", 0, UniformKind::Vec3),
    ("attenuation_constant", 12, UniformKind::Float),
    ("ambient", 16, UniformKind::Vec3),
    ("attenuation_linear", 28, UniformKind::Float),
    ("diffuse", 32, UniformKind::Vec3),
    ("attenuation_quadratic", 44, UniformKind::Float),
    ("specular", 48, UniformKind::Vec3),
];

/// Resolve a uniform name to its byte offset and kind
pub fn uniform_slot(name: &str) -> Option<(usize, UniformKind)> {
    if let Some(&(_, offset, kind)) = FIXED_SLOTS.iter().find(|(n, _, _)| *n == name) {
        return Some((offset, kind));
    }

    // point_lights[i].field
    let rest = name.strip_prefix("point_lights[")?;
    let (index, field) = rest.split_once("].")?;
    let index: usize = index.parse().ok()?;
    if index >= POINT_LIGHT_COUNT {
        return None;
    }
    let &(_, offset, kind) = POINT_LIGHT_FIELDS.iter().find(|(n, _, _)| *n == field)?;
    Some((POINT_LIGHTS_BASE + index * POINT_LIGHT_STRIDE + offset, kind))
}

/// Bytes of one `Uniforms` struct
#[derive(Clone, PartialEq)]
pub struct UniformBlock {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for UniformBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniformBlock")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Default for UniformBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformBlock {
    /// Zeroed block with identity `model` and `normal_matrix`
    pub fn new() -> Self {
        let mut block = Self {
            bytes: vec![0; UNIFORM_BLOCK_SIZE],
        };
        block.set("model", Mat4::IDENTITY);
        block.set("normal_matrix", Mat4::IDENTITY);
        block
    }

    /// Write `value` to the named slot. Unknown names and kind mismatches are
    /// ignored; returns whether anything was written.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        let value = value.into();
        let Some((offset, kind)) = uniform_slot(name) else {
            log::trace!("Ignoring unknown uniform '{}'", name);
            return false;
        };
        if kind != value.kind() {
            log::debug!(
                "Ignoring uniform '{}': expected {:?}, got {:?}",
                name,
                kind,
                value.kind()
            );
            return false;
        }
        value.write(&mut self.bytes[offset..]);
        true
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn read_f32(&self, offset: usize) -> f32 {
        f32::from_le_bytes([
            self.bytes[offset],
            self.bytes[offset + 1],
            self.bytes[offset + 2],
            self.bytes[offset + 3],
        ])
    }

    /// Read back a named slot
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        let (offset, kind) = uniform_slot(name)?;
        let floats = |n: usize| -> Vec<f32> { (0..n).map(|i| self.read_f32(offset + 4 * i)).collect() };
        Some(match kind {
            UniformKind::Int => UniformValue::Int(i32::from_le_bytes([
                self.bytes[offset],
                self.bytes[offset + 1],
                self.bytes[offset + 2],
                self.bytes[offset + 3],
            ])),
            UniformKind::Float => UniformValue::Float(self.read_f32(offset)),
            UniformKind::Vec3 => UniformValue::Vec3(Vec3::from_slice(&floats(3))),
            UniformKind::Vec4 => UniformValue::Vec4(Vec4::from_slice(&floats(4))),
            UniformKind::Mat4 => UniformValue::Mat4(Mat4::from_cols_slice(&floats(16))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_match_wgsl_layout() {
        assert_eq!(uniform_slot("eye_pos"), Some((256, UniformKind::Vec3)));
        assert_eq!(uniform_slot("material.specular"), Some((288, UniformKind::Vec3)));
        assert_eq!(uniform_slot("point_lights[0].position"), Some((368, UniformKind::Vec3)));
        assert_eq!(uniform_slot("point_lights[1].specular"), Some((368 + 64 + 48, UniformKind::Vec3)));
        assert_eq!(
            uniform_slot("point_lights[1].attenuation_quadratic"),
            Some((368 + 64 + 44, UniformKind::Float))
        );
    }

    #[test]
    fn test_unknown_names_resolve_to_none() {
        assert_eq!(uniform_slot("u_time"), None);
        assert_eq!(uniform_slot("point_lights[2].position"), None);
        assert_eq!(uniform_slot("point_lights[0].radius"), None);
        assert_eq!(uniform_slot("point_lights[x].position"), None);
    }

    #[test]
    fn test_unknown_uniform_is_noop() {
        let mut block = UniformBlock::new();
        let before = block.clone();
        assert!(!block.set("does_not_exist", 1.0f32));
        assert_eq!(block, before);
    }

    #[test]
    fn test_kind_mismatch_is_noop() {
        let mut block = UniformBlock::new();
        let before = block.clone();
        assert!(!block.set("view", Vec3::ONE));
        assert!(!block.set("material.shininess", 64i32));
        assert_eq!(block, before);
    }

    #[test]
    fn test_known_uniform_writes_offset() {
        let mut block = UniformBlock::new();
        assert!(block.set("material.shininess", 64.0f32));
        assert_eq!(block.read_f32(284), 64.0);

        assert!(block.set("point_lights[1].position", Vec3::new(0.0, 0.0, -2.0)));
        assert_eq!(block.read_f32(368 + 64 + 8), -2.0);
        assert_eq!(block.get("point_lights[1].position"), Some(UniformValue::Vec3(Vec3::new(0.0, 0.0, -2.0))));
    }

    #[test]
    fn test_matrix_roundtrip_and_identity_defaults() {
        let mut block = UniformBlock::new();
        assert_eq!(block.get("model"), Some(UniformValue::Mat4(Mat4::IDENTITY)));
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, Vec3::Y);
        block.set("view", view);
        assert_eq!(block.get("view"), Some(UniformValue::Mat4(view)));
        assert_eq!(block.as_bytes().len(), UNIFORM_BLOCK_SIZE);
    }

    #[test]
    fn test_vec3_does_not_clobber_neighbor() {
        let mut block = UniformBlock::new();
        block.set("Tex1", 7);
        block.set("eye_pos", Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(block.get("Tex1"), Some(UniformValue::Int(7)));
    }
}
