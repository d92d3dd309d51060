//! Session and rig configuration
//!
//! `SessionConfig` is resolved from, in order of precedence:
//! 1. An explicit path (CLI `--config`)
//! 2. Project-local `./shutter.toml`
//! 3. Built-in defaults
//!
//! Every field has a default, so a partial file is valid.

use crate::camera::Camera;
use crate::error::{Result, ShutterError};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Local config file picked up when no explicit path is given
pub const LOCAL_CONFIG: &str = "shutter.toml";

/// Internal format of the offscreen color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Rgb8,
    Rgba8,
    /// Anything the backend reports that is not 8-bit RGB(A)
    #[serde(other)]
    Other,
}

impl PixelFormat {
    /// Channels kept when reading back and encoding a target of this format
    pub fn channels(&self) -> u8 {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Other => 3,
        }
    }
}

/// Viewport, default camera, and output settings for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_camera_position")]
    pub camera_position: [f32; 3],
    #[serde(default)]
    pub camera_target: [f32; 3],
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],
    #[serde(default)]
    pub target_format: PixelFormat,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_camera_position() -> [f32; 3] {
    [0.0, 0.0, 2.0]
}
fn default_fov() -> f32 {
    45.0
}
fn default_near() -> f32 {
    0.1
}
fn default_far() -> f32 {
    100.0
}
fn default_clear_color() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}
fn default_prefix() -> String {
    "cam_".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            camera_position: default_camera_position(),
            camera_target: [0.0; 3],
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
            clear_color: default_clear_color(),
            target_format: PixelFormat::default(),
            prefix: default_prefix(),
        }
    }
}

impl SessionConfig {
    /// Resolve the config: explicit path, else `./shutter.toml`, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            log::info!("Using {}", local.display());
            return Self::load_from_file(&local);
        }
        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ShutterError::ConfigError(format!(
                "viewport must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ShutterError::ConfigError(format!(
                "invalid clip planes near={} far={}",
                self.near, self.far
            )));
        }
        if self.camera_position == self.camera_target {
            return Err(ShutterError::ConfigError(
                "default camera position equals its target".into(),
            ));
        }
        Ok(())
    }

    pub fn default_position(&self) -> Vec3 {
        Vec3::from_array(self.camera_position)
    }

    pub fn default_target(&self) -> Vec3 {
        Vec3::from_array(self.camera_target)
    }

    /// A camera at `position` looking at the default target
    pub fn camera_at(&self, position: Vec3) -> Camera {
        let mut camera = Camera::new(self.width, self.height);
        camera.fov = self.fov;
        camera.near = self.near;
        camera.far = self.far;
        camera.set_position(position);
        camera.set_target(self.default_target());
        camera
    }

    /// The session's default camera
    pub fn default_camera(&self) -> Camera {
        self.camera_at(self.default_position())
    }
}

/// One explicitly placed camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSpec {
    pub position: [f32; 3],
    /// Rescale to this distance from the target when positive
    #[serde(default)]
    pub distance: Option<f32>,
}

/// Cameras evenly spaced on a horizontal circle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    pub count: u32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub distance: Option<f32>,
}

/// Axis-aligned grid of cameras around a base position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShakerSpec {
    pub center: [f32; 3],
    #[serde(default = "default_shaker_range")]
    pub range: [f32; 3],
    #[serde(default = "default_shaker_step")]
    pub step: [f32; 3],
    #[serde(default)]
    pub distance: Option<f32>,
}

pub(crate) fn default_shaker_range() -> [f32; 3] {
    [0.1; 3]
}
pub(crate) fn default_shaker_step() -> [f32; 3] {
    [0.05; 3]
}

/// Camera placement requests read from a rig file.
///
/// ```toml
/// [[ring]]
/// count = 8
/// height = 0.5
/// distance = 2.0
///
/// [[point]]
/// position = [0.0, 2.0, 0.1]
/// ```
///
/// Requests apply per kind in file order: points, then rings, then shakers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigSpec {
    #[serde(default, rename = "point")]
    pub points: Vec<PointSpec>,
    #[serde(default, rename = "ring")]
    pub rings: Vec<RingSpec>,
    #[serde(default, rename = "shaker")]
    pub shakers: Vec<ShakerSpec>,
}

impl RigSpec {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let spec: Self = toml::from_str(content)?;
        for shaker in &spec.shakers {
            if shaker.step.iter().any(|&s| s <= 0.0) {
                return Err(ShutterError::ConfigError(format!(
                    "shaker step must be positive, got {:?}",
                    shaker.step
                )));
            }
        }
        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.rings.is_empty() && self.shakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.camera_position, [0.0, 0.0, 2.0]);
        assert_eq!(config.fov, 45.0);
        assert_eq!(config.target_format, PixelFormat::Rgb8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SessionConfig = toml::from_str(
            r#"
width = 320
height = 240
target_format = "rgba8"
"#,
        )
        .unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.far, 100.0);
        assert_eq!(config.target_format, PixelFormat::Rgba8);
        assert_eq!(config.prefix, "cam_");
    }

    #[test]
    fn test_unknown_format_falls_back() {
        let config: SessionConfig = toml::from_str(r#"target_format = "bgr10a2""#).unwrap();
        assert_eq!(config.target_format, PixelFormat::Other);
        assert_eq!(config.target_format.channels(), 3);
        assert_eq!(PixelFormat::Rgba8.channels(), 4);
    }

    #[test]
    fn test_validate_rejects_bad_planes() {
        let config = SessionConfig {
            near: 1.0,
            far: 0.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ShutterError::ConfigError(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("shutter_config_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("shutter.toml");

        let config = SessionConfig {
            width: 64,
            prefix: "view".into(),
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = SessionConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let path = std::env::temp_dir().join(format!("shutter_missing_{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(SessionConfig::load(Some(&path)), Err(ShutterError::IoError(_))));
    }

    #[test]
    fn test_default_camera_looks_at_target() {
        let camera = SessionConfig::default().default_camera();
        assert!((camera.front() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_rig_spec_parse() {
        let spec = RigSpec::parse(
            r#"
[[ring]]
count = 4
height = 0.5
distance = 2.0

[[point]]
position = [1.0, 2.0, 3.0]

[[shaker]]
center = [0.0, 0.0, 1.0]
"#,
        )
        .unwrap();
        assert_eq!(spec.rings[0].count, 4);
        assert_eq!(spec.points[0].distance, None);
        assert_eq!(spec.shakers[0].range, [0.1; 3]);
        assert_eq!(spec.shakers[0].step, [0.05; 3]);
    }

    #[test]
    fn test_rig_spec_rejects_zero_step() {
        let result = RigSpec::parse(
            r#"
[[shaker]]
center = [0.0, 0.0, 1.0]
step = [0.1, 0.0, 0.1]
"#,
        );
        assert!(matches!(result, Err(ShutterError::ConfigError(_))));
    }
}
