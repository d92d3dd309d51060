//! Free-fly perspective camera
//!
//! Euler-angle camera (yaw/pitch in degrees) used both for rig poses and for
//! the interactive view. Yaw -90° looks down -Z.

use glam::{Mat4, Vec3};

const DEFAULT_YAW: f32 = -90.0;
const DEFAULT_PITCH: f32 = 0.0;
const DEFAULT_SPEED: f32 = 2.5;
const DEFAULT_SENSITIVITY: f32 = 0.1;
const MAX_PITCH: f32 = 89.0;
const MIN_FOV: f32 = 1.0;
const MAX_FOV: f32 = 45.0;

/// Fly-camera movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// A perspective camera with fly controls
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    /// Degrees
    pub yaw: f32,
    /// Degrees, clamped to ±89 by mouse input
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub width: u32,
    pub height: u32,
    pub near: f32,
    pub far: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, 2.0),
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            fov: MAX_FOV,
            width,
            height,
            near: 0.1,
            far: 100.0,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Point the camera at `target`, deriving yaw and pitch
    pub fn set_target(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            log::warn!("Camera target equals its position, keeping orientation");
            return;
        }
        self.pitch = dir.y.clamp(-1.0, 1.0).asin().to_degrees();
        self.yaw = dir.z.atan2(dir.x).to_degrees();
        self.update_vectors();
    }

    /// Point one unit ahead along the current front
    pub fn target(&self) -> Vec3 {
        self.position + self.front
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Projection with wgpu's 0..1 clip depth
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect(), self.near, self.far)
    }

    /// Projection with OpenGL's -1..1 clip depth, the convention calibration
    /// intrinsics are derived from
    pub fn gl_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), self.aspect(), self.near, self.far)
    }

    pub fn move_position(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        let offset = match direction {
            CameraMovement::Forward => self.front,
            CameraMovement::Backward => -self.front,
            CameraMovement::Left => -self.right,
            CameraMovement::Right => self.right,
            CameraMovement::Up => self.up,
            CameraMovement::Down => -self.up,
        };
        self.position += offset * velocity;
    }

    /// Apply a mouse delta (already in screen units, y pointing up)
    pub fn update_rotation(&mut self, pitch_offset: f32, yaw_offset: f32) {
        self.yaw += yaw_offset * self.mouse_sensitivity;
        self.pitch += pitch_offset * self.mouse_sensitivity;
        self.pitch = self.pitch.clamp(-MAX_PITCH, MAX_PITCH);
        self.update_vectors();
    }

    pub fn zoom(&mut self, offset: f32) {
        self.fov = (self.fov - offset).clamp(MIN_FOV, MAX_FOV);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();

        // Looking straight up or down: fall back to the yaw direction's right
        let right = self.front.cross(self.world_up);
        self.right = if right.length_squared() > 1e-10 {
            right.normalize()
        } else {
            Vec3::new(-yaw.sin(), 0.0, yaw.cos())
        };
        self.up = self.right.cross(self.front).normalize();
    }
}
