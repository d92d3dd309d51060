//! Fixed material and light rig pushed to the main program

use crate::backend::{ProgramRole, RenderBackend};
use glam::Vec3;
use shutter_core::{ShaderPair, ShaderVariant};

pub const OBJECT_COLOR: Vec3 = Vec3::new(0.6, 0.6, 0.6);
pub const SHININESS: f32 = 64.0;

pub const DIRECTIONAL_DIRECTION: Vec3 = Vec3::new(-0.2, -1.0, -0.5);

pub const POINT_LIGHT_POSITIONS: [Vec3; 2] = [Vec3::new(0.7, 0.2, 2.0), Vec3::new(0.0, 0.0, -2.0)];

/// Constant, linear, quadratic
pub const POINT_LIGHT_ATTENUATION: (f32, f32, f32) = (1.0, 0.09, 0.032);

/// Set the object material on the main program
pub fn apply_material<B: RenderBackend + ?Sized>(backend: &mut B, shaders: ShaderPair) {
    backend.use_program(ProgramRole::Main);
    if shaders.vertex != ShaderVariant::NoTexture {
        backend.set_uniform("Tex1", 0i32.into());
    }
    backend.set_uniform("material.diffuse", OBJECT_COLOR.into());
    backend.set_uniform("material.specular", (0.3 * OBJECT_COLOR).into());
    backend.set_uniform("material.shininess", SHININESS.into());
}

/// Set the directional light and both point lights on the main program
pub fn apply_lights<B: RenderBackend + ?Sized>(backend: &mut B) {
    backend.use_program(ProgramRole::Main);

    backend.set_uniform("directional_light.direction", DIRECTIONAL_DIRECTION.into());
    backend.set_uniform("directional_light.ambient", Vec3::splat(0.2).into());
    backend.set_uniform("directional_light.diffuse", Vec3::splat(0.7).into());
    backend.set_uniform("directional_light.specular", Vec3::ONE.into());

    let (constant, linear, quadratic) = POINT_LIGHT_ATTENUATION;
    for (i, position) in POINT_LIGHT_POSITIONS.iter().enumerate() {
        let name = format!("point_lights[{}]", i);
        backend.set_uniform(&format!("{name}.position"), (*position).into());
        backend.set_uniform(&format!("{name}.ambient"), Vec3::splat(0.2).into());
        backend.set_uniform(&format!("{name}.diffuse"), Vec3::splat(0.5).into());
        backend.set_uniform(&format!("{name}.specular"), Vec3::ONE.into());
        backend.set_uniform(&format!("{name}.attenuation_constant"), constant.into());
        backend.set_uniform(&format!("{name}.attenuation_linear"), linear.into());
        backend.set_uniform(&format!("{name}.attenuation_quadratic"), quadratic.into());
    }
}
