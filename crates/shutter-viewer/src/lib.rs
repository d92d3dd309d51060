//! Shutter Viewer - fly through a scene and its camera rig
//!
//! Opens a window showing the object and a gizmo at every rig camera, with
//! fly-camera keyboard and mouse controls.

mod clock;
mod input;
mod session;

pub use clock::FrameClock;
pub use input::InputState;
pub use session::{view_scene, ViewerApp};
