//! Shutter Core - Foundational types for the Shutter mesh photographer
//!
//! This crate holds everything that does not need a GPU:
//! - `Camera` - Fly camera with view/projection matrices
//! - `CameraRig`, `CameraPose` - Procedural camera placement
//! - `ShaderVariant`, `VertexLayout` - Variant-driven vertex layouts
//! - `MeshData` - Mesh provider contract and vertex packing
//! - Calibration export, session configuration, logging, errors

pub mod calibration;
mod camera;
mod config;
mod error;
pub mod logging;
mod mesh;
mod rig;
mod variant;

pub use camera::{Camera, CameraMovement};
pub use config::{PixelFormat, PointSpec, RigSpec, RingSpec, SessionConfig, ShakerSpec, LOCAL_CONFIG};
pub use error::{Result, ShutterError};
pub use mesh::{
    decode_face_id, encode_face_id, ColorVertex, FaceIdVertex, MeshData, NormalVertex,
    PackedMesh, PlainVertex, TextureImage, TexturedVertex, UvChannel,
};
pub use rig::{CameraPose, CameraRig};
pub use variant::{DrawMode, LayoutKind, ShaderPair, ShaderVariant, VertexAttribute, VertexLayout};
