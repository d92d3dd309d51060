//! Export orchestration: one rendered image per rig camera

use crate::backend::{ObjectRole, ProgramRole, RenderBackend, SceneSetup, TargetKind};
use crate::gizmo::{gizmo_mesh, gizmo_model_matrix};
use crate::lighting::{apply_lights, apply_material};
use glam::{Mat4, Vec3};
use shutter_core::calibration::write_calibration;
use shutter_core::{
    Camera, CameraPose, CameraRig, MeshData, PackedMesh, PixelFormat, Result, SessionConfig, ShaderPair,
    ShaderVariant,
};
use std::path::{Path, PathBuf};

/// Renders a mesh from every camera of a rig
pub struct Photographer {
    config: SessionConfig,
    mesh: MeshData,
    shaders: ShaderPair,
    rig: CameraRig,
}

impl Photographer {
    pub fn new(config: SessionConfig, mesh: MeshData, shaders: ShaderPair) -> Self {
        let rig = CameraRig::new(config.clone());
        Self {
            config,
            mesh,
            shaders,
            rig,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn shaders(&self) -> ShaderPair {
        self.shaders
    }

    pub fn set_shaders(&mut self, shaders: ShaderPair) {
        self.shaders = shaders;
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut CameraRig {
        &mut self.rig
    }

    pub fn cameras(&self) -> &[CameraPose] {
        self.rig.cameras()
    }

    pub fn add_camera_at_position(&mut self, x: f32, y: f32, z: f32, distance: Option<f32>) -> Option<usize> {
        self.rig.add_at_position(x, y, z, distance)
    }

    pub fn add_camera_ring(&mut self, count: u32, height: f32, distance: Option<f32>) {
        self.rig.add_ring(count, height, distance);
    }

    pub fn add_camera_shaker(&mut self, center: Vec3, ranges: Vec3, steps: Vec3, distance: Option<f32>) {
        self.rig.add_shaker(center, ranges, steps, distance);
    }

    pub fn add_camera_shaker_default(&mut self, x: f32, y: f32, z: f32, distance: Option<f32>) {
        self.rig.add_shaker_default(x, y, z, distance);
    }

    pub fn clear_cameras(&mut self) {
        self.rig.clear_cameras();
    }

    /// Fly camera starting at the session defaults
    pub fn default_camera(&self) -> Camera {
        self.config.default_camera()
    }

    // Registered cameras, or the default pose alone when there are none
    fn export_poses(&self) -> Vec<CameraPose> {
        if self.rig.is_empty() {
            log::warn!("No cameras registered, using the default camera");
            vec![self.rig.default_pose()]
        } else {
            self.rig.cameras().to_vec()
        }
    }

    /// Render every camera and write `<output_dir>/<prefix><id>.png`.
    ///
    /// Returns the names of the files actually written. All backend
    /// resources are released before returning, on success or failure.
    pub fn export_all<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<Vec<String>> {
        let result = self.run_export(backend, output_dir, prefix);
        backend.teardown();
        result
    }

    fn run_export<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<Vec<String>> {
        let poses = self.export_poses();
        std::fs::create_dir_all(output_dir)?;
        let object = self.mesh.pack(self.shaders.vertex)?;

        backend.setup_scene(&SceneSetup {
            pair: self.shaders,
            object,
            gizmo: None,
        })?;
        backend.setup_offscreen_target(self.config.width, self.config.height, self.config.target_format)?;
        apply_material(backend, self.shaders);
        apply_lights(backend);

        let mut written = Vec::with_capacity(poses.len());
        let mut format_warned = false;
        for pose in &poses {
            backend.bind_target(TargetKind::Offscreen)?;
            backend.clear(self.config.clear_color);
            backend.use_program(ProgramRole::Main);
            push_camera(backend, pose.view, pose.projection, pose.position);
            push_model(backend, Mat4::IDENTITY);
            backend.draw_object(ObjectRole::Main)?;
            backend.bind_target(TargetKind::Default)?;

            let pixels = backend.read_color_target()?;
            warn_unrecognized_format(pixels.internal_format, &mut format_warned);
            let name = format!("{}{}.png", prefix, pose.id);
            match pixels.write_png(&output_dir.join(&name)) {
                Ok(()) => {
                    log::debug!("Saved {}", name);
                    written.push(name);
                }
                Err(e) => log::error!("Failed to save camera {}: {}", pose.id, e),
            }
        }

        log::info!(
            "Exported {}/{} image(s) to {}",
            written.len(),
            poses.len(),
            output_dir.display()
        );
        Ok(written)
    }

    /// Write OpenCV calibration JSON for every camera
    pub fn export_calibration(&self, output_dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir)?;
        self.export_poses()
            .iter()
            .map(|pose| write_calibration(pose, output_dir, prefix))
            .collect()
    }

    /// Upload the object, the camera gizmo, material and lights for the
    /// interactive view
    pub fn setup_view<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<()> {
        let object = self.mesh.pack(self.shaders.vertex)?;
        let gizmo = gizmo_mesh();
        let gizmo_packed: PackedMesh<'_> = gizmo.pack(ShaderVariant::NoTexture)?;

        backend.setup_scene(&SceneSetup {
            pair: self.shaders,
            object,
            gizmo: Some(gizmo_packed),
        })?;
        apply_material(backend, self.shaders);
        apply_lights(backend);
        Ok(())
    }

    /// Draw one interactive frame seen from `view_camera`: the object plus a
    /// gizmo for every rig camera
    pub fn render_view_frame<B: RenderBackend + ?Sized>(&self, backend: &mut B, view_camera: &Camera) -> Result<()> {
        backend.bind_target(TargetKind::Default)?;
        backend.clear(self.config.clear_color);

        let view = view_camera.view_matrix();
        let projection = view_camera.projection_matrix();
        for program in [ProgramRole::Main, ProgramRole::Gizmo] {
            backend.use_program(program);
            push_camera(backend, view, projection, view_camera.position);
        }

        backend.use_program(ProgramRole::Main);
        push_model(backend, Mat4::IDENTITY);
        backend.draw_object(ObjectRole::Main)?;

        backend.use_program(ProgramRole::Gizmo);
        for pose in self.rig.cameras() {
            push_model(backend, gizmo_model_matrix(pose.view, pose.position));
            backend.draw_object(ObjectRole::Gizmo)?;
        }
        Ok(())
    }
}

/// Warn about a target format without a known channel count, once per
/// export. Returns whether a warning was logged.
fn warn_unrecognized_format(format: PixelFormat, warned: &mut bool) -> bool {
    if format != PixelFormat::Other || *warned {
        return false;
    }
    log::warn!("Unrecognized render target format, writing 3 channels");
    *warned = true;
    true
}

fn push_camera<B: RenderBackend + ?Sized>(backend: &mut B, view: Mat4, projection: Mat4, eye: Vec3) {
    backend.set_uniform("view", view.into());
    backend.set_uniform("projection", projection.into());
    backend.set_uniform("eye_pos", eye.into());
}

fn push_model<B: RenderBackend + ?Sized>(backend: &mut B, model: Mat4) {
    backend.set_uniform("model", model.into());
    backend.set_uniform("normal_matrix", model.inverse().transpose().into());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_format_warns_once_per_export() {
        let mut warned = false;
        assert!(!warn_unrecognized_format(PixelFormat::Rgb8, &mut warned));
        assert!(warn_unrecognized_format(PixelFormat::Other, &mut warned));
        assert!(!warn_unrecognized_format(PixelFormat::Other, &mut warned));
        assert!(!warn_unrecognized_format(PixelFormat::Other, &mut warned));

        let mut next_export = false;
        assert!(warn_unrecognized_format(PixelFormat::Other, &mut next_export));
    }
}
