//! Shutter Import - Mesh provider
//!
//! Reads glTF/GLB files into a single normalized `MeshData` carrying the
//! vertex channel the selected shader variant needs.

mod gltf_import;
mod types;

pub use gltf_import::{import_gltf, read_gltf};
pub use types::{ImportResult, ImportedMaterial, ImportedPrimitive};
