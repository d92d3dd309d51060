//! OpenCV camera calibration export
//!
//! Each pose is written as an OpenCV FileStorage JSON document that
//! `cv::FileStorage` can read back directly:
//!
//! ```json
//! {
//!   "image_width": 800,
//!   "image_height": 600,
//!   "camera_matrix": { "type_id": "opencv-matrix", "rows": 3, "cols": 3, "dt": "d", "data": [...] },
//!   ...
//! }
//! ```
//!
//! OpenCV cameras look down +Z with +Y pointing down, so the GL view rotation
//! and translation get rows 1 and 2 negated.

use crate::error::Result;
use crate::rig::CameraPose;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dense matrix in OpenCV FileStorage layout (row-major doubles)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenCvMatrix {
    pub type_id: String,
    pub rows: usize,
    pub cols: usize,
    pub dt: String,
    pub data: Vec<f64>,
}

impl OpenCvMatrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self {
            type_id: "opencv-matrix".to_string(),
            rows,
            cols,
            dt: "d".to_string(),
            data,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }
}

/// Intrinsics and extrinsics of one camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCalibration {
    pub image_width: u32,
    pub image_height: u32,
    pub camera_matrix: OpenCvMatrix,
    pub distortion_coefficients: OpenCvMatrix,
    pub rotation: OpenCvMatrix,
    pub translation: OpenCvMatrix,
    pub camera_position: OpenCvMatrix,
}

impl CameraCalibration {
    pub fn from_pose(pose: &CameraPose) -> Self {
        let (w, h) = (pose.width as f64, pose.height as f64);
        let projection = pose.gl_projection();
        let fx = projection.x_axis.x as f64 * w / 2.0;
        let fy = projection.y_axis.y as f64 * h / 2.0;
        let camera_matrix = vec![fx, 0.0, w / 2.0, 0.0, fy, h / 2.0, 0.0, 0.0, 1.0];

        let view = pose.view;
        let cols = [view.x_axis, view.y_axis, view.z_axis];
        let mut rotation = Vec::with_capacity(9);
        for row in 0..3 {
            let sign = if row == 0 { 1.0 } else { -1.0 };
            for col in &cols {
                rotation.push(sign * col[row] as f64);
            }
        }
        let t = view.w_axis;
        let translation = vec![t.x as f64, -t.y as f64, -t.z as f64];
        let position = pose.position.to_array().map(f64::from).to_vec();

        Self {
            image_width: pose.width,
            image_height: pose.height,
            camera_matrix: OpenCvMatrix::new(3, 3, camera_matrix),
            distortion_coefficients: OpenCvMatrix::new(1, 5, vec![0.0; 5]),
            rotation: OpenCvMatrix::new(3, 3, rotation),
            translation: OpenCvMatrix::new(3, 1, translation),
            camera_position: OpenCvMatrix::new(3, 1, position),
        }
    }
}

/// File name for a camera's calibration
pub fn calibration_file_name(prefix: &str, id: usize) -> String {
    format!("{}{}.json", prefix, id)
}

/// Write `<dir>/<prefix><id>.json` for one pose
pub fn write_calibration(pose: &CameraPose, dir: &Path, prefix: &str) -> Result<PathBuf> {
    let path = dir.join(calibration_file_name(prefix, pose.id));
    let calibration = CameraCalibration::from_pose(pose);
    let json = serde_json::to_string_pretty(&calibration)?;
    std::fs::write(&path, json)?;
    log::debug!("Wrote calibration {}", path.display());
    Ok(path)
}
