//! Camera gizmo geometry and placement

use glam::{Mat3, Mat4, Vec3};
use shutter_core::MeshData;

const BODY_LENGTH: f32 = 0.08;
const BODY_HALF: f32 = 0.03;
const LENS_LENGTH: f32 = 0.06;
const LENS_HALF: f32 = 0.035;

/// Small camera-shaped mesh: a box body with a pyramid lens opening along +X
pub fn gizmo_mesh() -> MeshData {
    let mut mesh = MeshData::unit_cube();
    for p in &mut mesh.positions {
        p[0] = p[0] * BODY_LENGTH - BODY_LENGTH * 0.5;
        p[1] *= BODY_HALF * 2.0;
        p[2] *= BODY_HALF * 2.0;
    }

    let apex = Vec3::ZERO;
    let base = [
        Vec3::new(LENS_LENGTH, -LENS_HALF, -LENS_HALF),
        Vec3::new(LENS_LENGTH, LENS_HALF, -LENS_HALF),
        Vec3::new(LENS_LENGTH, LENS_HALF, LENS_HALF),
        Vec3::new(LENS_LENGTH, -LENS_HALF, LENS_HALF),
    ];
    let center = Vec3::new(LENS_LENGTH * 0.75, 0.0, 0.0);
    for i in 0..4 {
        push_outward_triangle(&mut mesh, center, [apex, base[i], base[(i + 1) % 4]]);
    }
    push_outward_triangle(&mut mesh, center, [base[0], base[1], base[2]]);
    push_outward_triangle(&mut mesh, center, [base[0], base[2], base[3]]);
    mesh
}

// Appends an un-shared triangle wound counter-clockwise when seen from outside
fn push_outward_triangle(mesh: &mut MeshData, center: Vec3, mut tri: [Vec3; 3]) {
    let mut normal = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or_zero();
    let centroid = (tri[0] + tri[1] + tri[2]) / 3.0;
    if normal.dot(centroid - center) < 0.0 {
        tri.swap(1, 2);
        normal = -normal;
    }
    let base = mesh.positions.len() as u32;
    for p in tri {
        mesh.positions.push(p.to_array());
        mesh.normals.push(normal.to_array());
    }
    mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
}

/// Model matrix placing a gizmo at a camera: the camera's inverse rotation,
/// a 90° turn about +Y so the lens faces the view direction, then the camera
/// position
pub fn gizmo_model_matrix(view: Mat4, position: Vec3) -> Mat4 {
    let rotation = Mat3::from_mat4(view).transpose();
    let mut model = Mat4::from_mat3(rotation) * Mat4::from_rotation_y(90f32.to_radians());
    model.w_axis = position.extend(1.0);
    model
}
