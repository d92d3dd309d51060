//! Render backend trait
//!
//! The photographer drives rendering through this trait as a small state
//! machine: set up a scene, bind a target, pick a program, push uniforms,
//! draw, read back. [`crate::WgpuBackend`] does it on the GPU,
//! [`crate::RecordingBackend`] records the calls for headless runs and tests.

use crate::uniforms::UniformValue;
use shutter_core::{PackedMesh, PixelFormat, Result, ShaderPair};

pub use crate::readback::{RowOrder, TargetPixels};

/// Framebuffer selected for subsequent clears and draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Offscreen,
    /// Window surface when there is one, otherwise nothing
    Default,
}

/// Which of the two programs receives uniforms and draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramRole {
    Main,
    Gizmo,
}

/// Which uploaded object a draw uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRole {
    Main,
    Gizmo,
}

/// Everything uploaded once per session
pub struct SceneSetup<'a> {
    pub pair: ShaderPair,
    pub object: PackedMesh<'a>,
    /// Camera marker, only needed by the interactive viewer
    pub gizmo: Option<PackedMesh<'a>>,
}

pub trait RenderBackend {
    /// Build both programs and upload the object (and gizmo). Fails with
    /// `AlreadyAllocated` if called twice without [`RenderBackend::teardown`].
    fn setup_scene(&mut self, scene: &SceneSetup<'_>) -> Result<()>;

    /// Allocate the offscreen color and depth attachments
    fn setup_offscreen_target(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<()>;

    fn bind_target(&mut self, target: TargetKind) -> Result<()>;

    fn clear(&mut self, color: [f32; 4]);

    fn use_program(&mut self, program: ProgramRole);

    /// Set a uniform on the current program. Unknown names are ignored.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Draw an object with the current program and its uniforms as they are now
    fn draw_object(&mut self, object: ObjectRole) -> Result<()>;

    /// Pixels of the offscreen color attachment after all pending draws
    fn read_color_target(&mut self) -> Result<TargetPixels>;

    /// Show the default target, if there is a window
    fn present(&mut self) -> Result<()>;

    fn resize(&mut self, width: u32, height: u32);

    /// Release every handle. Safe to call more than once.
    fn teardown(&mut self);

    /// Number of live GPU handles owned by the backend
    fn allocated_handles(&self) -> usize;
}
