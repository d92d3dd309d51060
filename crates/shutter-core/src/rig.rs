//! Procedural camera placement around a target
//!
//! A [`CameraRig`] accumulates [`CameraPose`]s from point, ring and shaker
//! requests. Poses are immutable once appended and their ids follow insertion
//! order, so `rig.cameras()[i].id == i` until the rig is cleared.

use crate::camera::Camera;
use crate::config::{default_shaker_range, default_shaker_step, RigSpec, SessionConfig};
use glam::{Mat4, Vec3};
use serde::Serialize;

/// One camera of a rig with its derived matrices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraPose {
    pub id: usize,
    pub position: Vec3,
    pub target: Vec3,
    pub width: u32,
    pub height: u32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub view: Mat4,
    /// wgpu clip space (0..1 depth)
    pub projection: Mat4,
}

impl CameraPose {
    pub fn from_camera(id: usize, camera: &Camera, target: Vec3) -> Self {
        Self {
            id,
            position: camera.position,
            target,
            width: camera.width,
            height: camera.height,
            fov: camera.fov,
            near: camera.near,
            far: camera.far,
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
        }
    }

    /// Rebuild the fly camera this pose was taken from
    pub fn camera(&self) -> Camera {
        let mut camera = Camera::new(self.width, self.height);
        camera.fov = self.fov;
        camera.near = self.near;
        camera.far = self.far;
        camera.set_position(self.position);
        camera.set_target(self.target);
        camera
    }

    /// OpenGL clip space projection (-1..1 depth)
    pub fn gl_projection(&self) -> Mat4 {
        self.camera().gl_projection_matrix()
    }
}

/// Camera poses for one export run
#[derive(Debug, Clone)]
pub struct CameraRig {
    defaults: SessionConfig,
    cameras: Vec<CameraPose>,
}

impl CameraRig {
    pub fn new(defaults: SessionConfig) -> Self {
        Self {
            defaults,
            cameras: Vec::new(),
        }
    }

    pub fn defaults(&self) -> &SessionConfig {
        &self.defaults
    }

    pub fn cameras(&self) -> &[CameraPose] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    pub fn clear_cameras(&mut self) {
        self.cameras.clear();
    }

    /// Pose at the session defaults with id 0
    pub fn default_pose(&self) -> CameraPose {
        let camera = self.defaults.default_camera();
        CameraPose::from_camera(0, &camera, self.defaults.default_target())
    }

    /// Normal of the default camera's projection plane
    pub fn default_projection_plane_normal(&self) -> Vec3 {
        self.defaults.default_target() - self.defaults.default_position()
    }

    /// Append one camera looking at the default target.
    ///
    /// With a positive `normalize_distance` the position is taken relative to
    /// the target and rescaled to lie exactly that far from it. Returns the
    /// new id, or `None` if the position coincides with the target.
    pub fn add_at_position(&mut self, x: f32, y: f32, z: f32, normalize_distance: Option<f32>) -> Option<usize> {
        let target = self.defaults.default_target();
        let mut position = Vec3::new(x, y, z);
        if let Some(distance) = normalize_distance.filter(|&d| d > 0.0) {
            position = target + (position - target).normalize_or_zero() * distance;
        }
        if (position - target).length_squared() <= f32::EPSILON * f32::EPSILON {
            log::warn!("Skipping camera at {:?}: position equals target", position);
            return None;
        }

        let id = self.cameras.len();
        let camera = self.defaults.camera_at(position);
        self.cameras.push(CameraPose::from_camera(id, &camera, target));
        log::trace!("camera {} at {:?}", id, position);
        Some(id)
    }

    /// `count` cameras evenly spaced on the unit circle at `height`
    pub fn add_ring(&mut self, count: u32, height: f32, distance: Option<f32>) {
        for i in 0..count {
            let theta = (360.0 * i as f32 / count as f32).to_radians();
            self.add_at_position(theta.cos(), height, theta.sin(), distance);
        }
    }

    /// Grid of cameras spanning `center ± ranges` with spacing `steps`,
    /// enumerated z outer, y middle, x inner
    pub fn add_shaker(&mut self, center: Vec3, ranges: Vec3, steps: Vec3, distance: Option<f32>) {
        let xs = axis_samples(center.x, ranges.x, steps.x);
        let ys = axis_samples(center.y, ranges.y, steps.y);
        let zs = axis_samples(center.z, ranges.z, steps.z);
        for &z in &zs {
            for &y in &ys {
                for &x in &xs {
                    self.add_at_position(x, y, z, distance);
                }
            }
        }
    }

    /// Shaker with range 0.1 and step 0.05 on every axis
    pub fn add_shaker_default(&mut self, x: f32, y: f32, z: f32, distance: Option<f32>) {
        self.add_shaker(
            Vec3::new(x, y, z),
            Vec3::from_array(default_shaker_range()),
            Vec3::from_array(default_shaker_step()),
            distance,
        );
    }

    /// Apply a rig file's requests
    pub fn apply(&mut self, spec: &RigSpec) {
        for point in &spec.points {
            let [x, y, z] = point.position;
            self.add_at_position(x, y, z, point.distance);
        }
        for ring in &spec.rings {
            self.add_ring(ring.count, ring.height, ring.distance);
        }
        for shaker in &spec.shakers {
            self.add_shaker(
                Vec3::from_array(shaker.center),
                Vec3::from_array(shaker.range),
                Vec3::from_array(shaker.step),
                shaker.distance,
            );
        }
    }
}

// Integer step counter keeps float drift from adding or dropping the last sample
fn axis_samples(center: f32, range: f32, step: f32) -> Vec<f32> {
    debug_assert!(step > 0.0, "shaker step must be positive, got {step}");
    if !(step > 0.0) {
        return Vec::new();
    }
    let start = center - range;
    let end = center + range + step * 0.5;
    let mut samples = Vec::new();
    let mut k = 0u32;
    loop {
        let v = start + k as f32 * step;
        if v >= end {
            break;
        }
        samples.push(v);
        k += 1;
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> CameraRig {
        CameraRig::new(SessionConfig::default())
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut rig = rig();
        rig.add_at_position(1.0, 0.0, 0.0, None);
        rig.add_ring(3, 0.0, None);
        rig.add_at_position(0.0, 0.0, 5.0, Some(2.0));
        for (i, pose) in rig.cameras().iter().enumerate() {
            assert_eq!(pose.id, i);
        }
        assert_eq!(rig.len(), 5);
    }

    #[test]
    fn test_ring_geometry() {
        let mut rig = rig();
        rig.add_ring(8, 0.3, None);
        assert_eq!(rig.len(), 8);
        for (i, pose) in rig.cameras().iter().enumerate() {
            assert!((pose.position.y - 0.3).abs() < 1e-6);
            let planar = Vec3::new(pose.position.x, 0.0, pose.position.z);
            assert!((planar.length() - 1.0).abs() < 1e-5);
            let angle = pose.position.z.atan2(pose.position.x).to_degrees().rem_euclid(360.0);
            assert!((angle - 45.0 * i as f32).abs() < 1e-3, "camera {i} at {angle}");
        }
    }

    #[test]
    fn test_ring_normalized_distance() {
        let mut rig = rig();
        rig.add_ring(6, 0.5, Some(3.0));
        for pose in rig.cameras() {
            assert!(((pose.position - pose.target).length() - 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_normalization_preserves_direction() {
        let mut rig = rig();
        rig.add_at_position(0.0, 3.0, 4.0, Some(10.0));
        let pose = &rig.cameras()[0];
        assert!((pose.position - Vec3::new(0.0, 6.0, 8.0)).length() < 1e-5);
    }

    #[test]
    fn test_normalization_relative_to_off_origin_target() {
        let config = SessionConfig {
            camera_target: [1.0, 0.0, 0.0],
            ..Default::default()
        };
        let mut rig = CameraRig::new(config);
        rig.add_at_position(1.0, 0.0, 4.0, Some(2.0));
        let pose = &rig.cameras()[0];
        assert!((pose.position - Vec3::new(1.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_non_positive_distance_keeps_position() {
        let mut rig = rig();
        rig.add_at_position(0.0, 3.0, 4.0, Some(0.0));
        rig.add_at_position(0.0, 3.0, 4.0, Some(-1.0));
        for pose in rig.cameras() {
            assert_eq!(pose.position, Vec3::new(0.0, 3.0, 4.0));
        }
    }

    #[test]
    fn test_position_at_target_is_skipped() {
        let mut rig = rig();
        assert_eq!(rig.add_at_position(0.0, 0.0, 0.0, None), None);
        assert!(rig.is_empty());
    }

    #[test]
    fn test_shaker_count_and_bounds() {
        let mut rig = rig();
        let center = Vec3::new(0.0, 0.0, 2.0);
        rig.add_shaker(center, Vec3::new(0.1, 0.2, 0.1), Vec3::new(0.05, 0.1, 0.1), None);
        // x: 5 samples, y: 5, z: 3
        assert_eq!(rig.len(), 5 * 5 * 3);
        let tol = 1e-5;
        for pose in rig.cameras() {
            assert!(pose.position.x >= -0.1 - tol && pose.position.x <= 0.1 + tol);
            assert!(pose.position.y >= -0.2 - tol && pose.position.y <= 0.2 + tol);
            assert!(pose.position.z >= 1.9 - tol && pose.position.z <= 2.1 + tol);
        }
    }

    #[test]
    fn test_shaker_order_x_innermost() {
        let mut rig = rig();
        rig.add_shaker(Vec3::new(0.0, 0.0, 2.0), Vec3::splat(0.1), Vec3::splat(0.1), None);
        let cams = rig.cameras();
        assert!(cams[1].position.x > cams[0].position.x);
        assert_eq!(cams[1].position.y, cams[0].position.y);
        assert_eq!(cams[3].position.y, cams[0].position.y + 0.1);
        assert_eq!(cams[9].position.z, cams[0].position.z + 0.1);
    }

    #[test]
    fn test_shaker_default() {
        let mut rig = rig();
        rig.add_shaker_default(0.0, 0.0, 2.0, None);
        assert_eq!(rig.len(), 125);
    }

    #[test]
    fn test_axis_samples_drift_free() {
        let samples = axis_samples(0.3, 0.3, 0.1);
        assert_eq!(samples.len(), 7);
        assert!((samples[6] - 0.6).abs() < 1e-5);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_zero_step_yields_nothing() {
        assert!(axis_samples(0.0, 1.0, 0.0).is_empty());
    }

    #[test]
    fn test_default_pose() {
        let rig = rig();
        let pose = rig.default_pose();
        assert_eq!(pose.id, 0);
        assert_eq!(pose.position, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(rig.default_projection_plane_normal(), Vec3::new(0.0, 0.0, -2.0));
        assert!(rig.is_empty());
    }

    #[test]
    fn test_apply_spec_and_clear() {
        let spec = RigSpec::parse(
            r#"
[[point]]
position = [0.0, 0.0, 3.0]

[[ring]]
count = 4
distance = 2.0
"#,
        )
        .unwrap();
        let mut rig = rig();
        rig.apply(&spec);
        assert_eq!(rig.len(), 5);
        assert_eq!(rig.cameras()[0].position, Vec3::new(0.0, 0.0, 3.0));
        rig.clear_cameras();
        assert!(rig.is_empty());
    }

    #[test]
    fn test_pose_camera_roundtrip_view() {
        let mut rig = rig();
        rig.add_at_position(1.0, 0.5, 1.0, Some(2.0));
        let pose = &rig.cameras()[0];
        let view = pose.camera().view_matrix();
        assert!(view.abs_diff_eq(pose.view, 1e-5));
    }
}
