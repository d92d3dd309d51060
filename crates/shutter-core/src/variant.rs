//! Shader variants and the vertex layouts they expect

use crate::error::ShutterError;
use crate::mesh::{ColorVertex, FaceIdVertex, NormalVertex, PlainVertex, TexturedVertex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem::{offset_of, size_of};
use std::str::FromStr;

/// One of the five fixed shading configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderVariant {
    /// Pass-through debug stage (positions only, solid color fragment)
    #[default]
    Default,
    /// Lit, untextured
    NoTexture,
    /// Lit, textured with one base color image
    Textured,
    /// Writes an RGB-encoded face index per fragment
    #[serde(rename = "faceidx")]
    FaceIndex,
    /// Per-vertex flat color, unlit
    Flat,
}

impl ShaderVariant {
    pub const ALL: [ShaderVariant; 5] = [
        ShaderVariant::Default,
        ShaderVariant::NoTexture,
        ShaderVariant::Textured,
        ShaderVariant::FaceIndex,
        ShaderVariant::Flat,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ShaderVariant::Default => "default",
            ShaderVariant::NoTexture => "notexture",
            ShaderVariant::Textured => "textured",
            ShaderVariant::FaceIndex => "faceidx",
            ShaderVariant::Flat => "flat",
        }
    }

    /// Vertex layout a mesh must provide when this variant drives the vertex stage
    pub fn layout(&self) -> VertexLayout {
        match self {
            ShaderVariant::Default => VertexLayout::PLAIN,
            ShaderVariant::NoTexture => VertexLayout::NORMAL,
            ShaderVariant::Textured => VertexLayout::TEXTURED,
            ShaderVariant::FaceIndex => VertexLayout::FACE_ID,
            ShaderVariant::Flat => VertexLayout::COLORED,
        }
    }
}

impl fmt::Display for ShaderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShaderVariant {
    type Err = ShutterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(ShaderVariant::Default),
            "notexture" | "no_texture" | "no-texture" => Ok(ShaderVariant::NoTexture),
            "textured" | "texture" => Ok(ShaderVariant::Textured),
            "faceidx" | "face_index" | "face-index" | "faceindex" => Ok(ShaderVariant::FaceIndex),
            "flat" => Ok(ShaderVariant::Flat),
            _ => Err(ShutterError::UnknownVariant(s.to_string())),
        }
    }
}

/// Vertex stage variant + fragment stage variant making up one program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ShaderPair {
    pub vertex: ShaderVariant,
    pub fragment: ShaderVariant,
}

impl ShaderPair {
    pub const fn new(vertex: ShaderVariant, fragment: ShaderVariant) -> Self {
        Self { vertex, fragment }
    }

    /// Same variant for both stages
    pub const fn uniform(variant: ShaderVariant) -> Self {
        Self::new(variant, variant)
    }

    /// Program used to draw camera gizmos
    pub const GIZMO: ShaderPair = ShaderPair::new(ShaderVariant::NoTexture, ShaderVariant::Default);

    pub fn layout(&self) -> VertexLayout {
        self.vertex.layout()
    }
}

/// Which vertex struct a layout describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    Plain,
    Normal,
    Textured,
    FaceId,
    Colored,
}

/// How the object is submitted to the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Shared vertices + index buffer
    Indexed,
    /// One vertex per triangle corner, no index buffer
    Arrays,
}

/// One enabled vertex attribute (always 32-bit floats)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub slot: u32,
    pub offset: u64,
    pub components: u32,
}

/// A vertex layout: struct kind, stride, enabled attribute slots, and draw mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub kind: LayoutKind,
    pub stride: u64,
    pub attributes: &'static [VertexAttribute],
    pub draw: DrawMode,
}

const POSITION: VertexAttribute = VertexAttribute {
    slot: 0,
    offset: 0,
    components: 3,
};

impl VertexLayout {
    pub const PLAIN: Self = Self {
        kind: LayoutKind::Plain,
        stride: size_of::<PlainVertex>() as u64,
        attributes: &[POSITION],
        draw: DrawMode::Indexed,
    };

    pub const NORMAL: Self = Self {
        kind: LayoutKind::Normal,
        stride: size_of::<NormalVertex>() as u64,
        attributes: &[
            POSITION,
            VertexAttribute {
                slot: 1,
                offset: offset_of!(NormalVertex, normal) as u64,
                components: 3,
            },
        ],
        draw: DrawMode::Indexed,
    };

    pub const TEXTURED: Self = Self {
        kind: LayoutKind::Textured,
        stride: size_of::<TexturedVertex>() as u64,
        attributes: &[
            POSITION,
            VertexAttribute {
                slot: 1,
                offset: offset_of!(TexturedVertex, normal) as u64,
                components: 3,
            },
            VertexAttribute {
                slot: 2,
                offset: offset_of!(TexturedVertex, uv) as u64,
                components: 2,
            },
        ],
        draw: DrawMode::Arrays,
    };

    // The normal is stored but not bound; slot 1 carries the face id
    pub const FACE_ID: Self = Self {
        kind: LayoutKind::FaceId,
        stride: size_of::<FaceIdVertex>() as u64,
        attributes: &[
            POSITION,
            VertexAttribute {
                slot: 1,
                offset: offset_of!(FaceIdVertex, face_id) as u64,
                components: 3,
            },
        ],
        draw: DrawMode::Indexed,
    };

    pub const COLORED: Self = Self {
        kind: LayoutKind::Colored,
        stride: size_of::<ColorVertex>() as u64,
        attributes: &[
            POSITION,
            VertexAttribute {
                slot: 1,
                offset: offset_of!(ColorVertex, color) as u64,
                components: 3,
            },
        ],
        draw: DrawMode::Arrays,
    };

    pub fn is_indexed(&self) -> bool {
        self.draw == DrawMode::Indexed
    }

    /// Largest enabled slot index
    pub fn max_slot(&self) -> u32 {
        self.attributes.iter().map(|a| a.slot).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_always_slot_zero() {
        for variant in ShaderVariant::ALL {
            let layout = variant.layout();
            assert_eq!(layout.attributes[0], POSITION, "{variant}");
        }
    }

    #[test]
    fn test_uv_slot_only_for_textured() {
        for variant in ShaderVariant::ALL {
            let has_slot_2 = variant.layout().attributes.iter().any(|a| a.slot == 2);
            assert_eq!(has_slot_2, variant == ShaderVariant::Textured, "{variant}");
        }
    }

    #[test]
    fn test_draw_modes() {
        assert!(ShaderVariant::NoTexture.layout().is_indexed());
        assert!(ShaderVariant::FaceIndex.layout().is_indexed());
        assert!(!ShaderVariant::Textured.layout().is_indexed());
        assert!(!ShaderVariant::Flat.layout().is_indexed());
    }

    #[test]
    fn test_strides_match_vertex_structs() {
        assert_eq!(VertexLayout::PLAIN.stride, 12);
        assert_eq!(VertexLayout::NORMAL.stride, 24);
        assert_eq!(VertexLayout::TEXTURED.stride, 32);
        assert_eq!(VertexLayout::FACE_ID.stride, 36);
        assert_eq!(VertexLayout::COLORED.stride, 36);
        assert_eq!(VertexLayout::FACE_ID.attributes[1].offset, 24);
        assert_eq!(VertexLayout::COLORED.attributes[1].offset, 24);
    }

    #[test]
    fn test_variant_parse_and_display() {
        for variant in ShaderVariant::ALL {
            let parsed: ShaderVariant = variant.to_string().parse().unwrap();
            assert_eq!(parsed, variant);
        }
        assert_eq!("face-index".parse::<ShaderVariant>().unwrap(), ShaderVariant::FaceIndex);
        assert!("phong".parse::<ShaderVariant>().is_err());
    }

    #[test]
    fn test_gizmo_pair() {
        assert_eq!(ShaderPair::GIZMO.vertex, ShaderVariant::NoTexture);
        assert_eq!(ShaderPair::GIZMO.fragment, ShaderVariant::Default);
        assert_eq!(ShaderPair::GIZMO.layout(), VertexLayout::NORMAL);
    }
}
