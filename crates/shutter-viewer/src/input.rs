//! Input state management

use shutter_core::CameraMovement;
use std::collections::HashSet;
use winit::keyboard::KeyCode;

/// Held keys mapped to fly-camera directions
const MOVEMENT_KEYS: [(KeyCode, CameraMovement); 6] = [
    (KeyCode::KeyQ, CameraMovement::Forward),
    (KeyCode::KeyE, CameraMovement::Backward),
    (KeyCode::KeyW, CameraMovement::Up),
    (KeyCode::KeyS, CameraMovement::Down),
    (KeyCode::KeyA, CameraMovement::Left),
    (KeyCode::KeyD, CameraMovement::Right),
];

/// Keyboard and cursor state between frames
pub struct InputState {
    /// Keys currently held down
    keys_down: HashSet<KeyCode>,
    /// Last cursor position in window pixels, `None` until the first sample
    last_cursor: Option<(f64, f64)>,
    /// Wheel movement since the last frame, in lines
    scroll: f32,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_down: HashSet::new(),
            last_cursor: None,
            scroll: 0.0,
        }
    }

    pub fn process_key_down(&mut self, key: KeyCode) {
        self.keys_down.insert(key);
    }

    pub fn process_key_up(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Record a cursor sample and return the `(pitch, yaw)` offset since the
    /// previous one. The first sample only sets the baseline. Screen y grows
    /// downward, so it is reversed for pitch.
    pub fn process_cursor(&mut self, x: f64, y: f64) -> Option<(f32, f32)> {
        let previous = self.last_cursor.replace((x, y));
        let (last_x, last_y) = previous?;
        let yaw_offset = (x - last_x) as f32;
        let pitch_offset = (last_y - y) as f32;
        Some((pitch_offset, yaw_offset))
    }

    /// `(pitch, yaw)` offset for a raw pointer delta, used while the cursor
    /// is captured and has no meaningful position
    pub fn motion_offset(dx: f64, dy: f64) -> (f32, f32) {
        (-dy as f32, dx as f32)
    }

    /// Forget the cursor baseline, e.g. after the cursor left the window
    pub fn reset_cursor(&mut self) {
        self.last_cursor = None;
    }

    pub fn process_scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    /// Wheel movement accumulated since the last call
    pub fn take_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll)
    }

    /// Directions whose keys are held, in a fixed order
    pub fn movement(&self) -> impl Iterator<Item = CameraMovement> + '_ {
        MOVEMENT_KEYS
            .iter()
            .filter(|(key, _)| self.keys_down.contains(key))
            .map(|&(_, direction)| direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cursor_sample_only_sets_baseline() {
        let mut input = InputState::new();
        assert_eq!(input.process_cursor(400.0, 300.0), None);
        assert_eq!(input.process_cursor(410.0, 295.0), Some((5.0, 10.0)));
    }

    #[test]
    fn test_motion_offset_reverses_y() {
        assert_eq!(InputState::motion_offset(3.0, -2.0), (2.0, 3.0));
        assert_eq!(InputState::motion_offset(0.0, 4.0), (-4.0, 0.0));
    }

    #[test]
    fn test_reset_cursor_reseeds() {
        let mut input = InputState::new();
        input.process_cursor(0.0, 0.0);
        input.reset_cursor();
        assert_eq!(input.process_cursor(100.0, 100.0), None);
    }

    #[test]
    fn test_movement_keys() {
        let mut input = InputState::new();
        input.process_key_down(KeyCode::KeyQ);
        input.process_key_down(KeyCode::KeyD);
        input.process_key_down(KeyCode::KeyX);
        let held: Vec<_> = input.movement().collect();
        assert_eq!(held, vec![CameraMovement::Forward, CameraMovement::Right]);

        input.process_key_up(KeyCode::KeyQ);
        let held: Vec<_> = input.movement().collect();
        assert_eq!(held, vec![CameraMovement::Right]);
    }

    #[test]
    fn test_scroll_is_consumed() {
        let mut input = InputState::new();
        input.process_scroll(1.0);
        input.process_scroll(2.0);
        assert_eq!(input.take_scroll(), 3.0);
        assert_eq!(input.take_scroll(), 0.0);
    }

    #[test]
    fn test_first_mouse_does_not_rotate_camera() {
        let mut input = InputState::new();
        let mut camera = shutter_core::Camera::default();
        let before = camera.clone();
        if let Some((pitch, yaw)) = input.process_cursor(640.0, 10.0) {
            camera.update_rotation(pitch, yaw);
        }
        assert_eq!(camera, before);
    }
}
