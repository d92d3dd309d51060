//! Shutter Render - multi-view offscreen renderer
//!
//! Renders one mesh from many cameras into an offscreen target and writes
//! each view to a PNG. The GPU path runs on wgpu; a recording backend stands
//! in for it in dry runs and tests.

mod backend;
mod context;
mod gizmo;
pub mod lighting;
mod photographer;
mod readback;
mod recording;
mod resources;
pub mod shader;
mod target;
pub mod uniforms;
mod wgpu_backend;

pub use backend::{ObjectRole, ProgramRole, RenderBackend, RowOrder, SceneSetup, TargetKind, TargetPixels};
pub use context::{GpuContext, RenderError, DEPTH_FORMAT, OFFSCREEN_FORMAT};
pub use gizmo::{gizmo_mesh, gizmo_model_matrix};
pub use photographer::Photographer;
pub use readback::flip_rows;
pub use recording::{Call, RecordingBackend};
pub use resources::{GpuSlot, MeshBuffers, SharedBindings};
pub use shader::ShaderProgram;
pub use target::OffscreenTarget;
pub use uniforms::{UniformBlock, UniformValue};
pub use wgpu_backend::WgpuBackend;
