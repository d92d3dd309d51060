use glam::{Mat4, Vec3};
use shutter_core::{MeshData, PixelFormat, SessionConfig, ShaderPair, ShaderVariant, ShutterError};
use shutter_render::{
    Call, ObjectRole, Photographer, ProgramRole, RecordingBackend, RenderBackend, RowOrder, TargetKind, UniformValue,
};
use std::path::PathBuf;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("shutter_{}_{}", name, uuid::Uuid::new_v4()))
}

fn small_config() -> SessionConfig {
    SessionConfig {
        width: 8,
        height: 6,
        ..SessionConfig::default()
    }
}

fn photographer(config: SessionConfig, vertex: ShaderVariant) -> Photographer {
    Photographer::new(config, MeshData::unit_cube(), ShaderPair::new(vertex, ShaderVariant::NoTexture))
}

#[test]
fn test_repeated_exports_are_hermetic() {
    let dir = temp_dir("hermetic");
    let mut photo = photographer(small_config(), ShaderVariant::NoTexture);
    photo.add_camera_ring(4, 0.5, Some(3.0));

    let mut backend = RecordingBackend::new();
    let first = photo.export_all(&mut backend, &dir, "cam_").unwrap();
    assert_eq!(backend.allocated_handles(), 0);
    let second = photo.export_all(&mut backend, &dir, "cam_").unwrap();
    assert_eq!(backend.allocated_handles(), 0);

    assert_eq!(first, vec!["cam_0.png", "cam_1.png", "cam_2.png", "cam_3.png"]);
    assert_eq!(first, second);
    for name in &first {
        assert!(dir.join(name).is_file());
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_empty_rig_uses_default_camera() {
    let dir = temp_dir("default_cam");
    let photo = photographer(small_config(), ShaderVariant::NoTexture);

    let mut backend = RecordingBackend::new();
    let written = photo.export_all(&mut backend, &dir, "view_").unwrap();
    assert_eq!(written, vec!["view_0.png"]);
    assert!(photo.cameras().is_empty());

    let (_, _, uniforms) = backend.draws().next().unwrap();
    let default_pose = photo.rig().default_pose();
    assert_eq!(uniforms.get("eye_pos"), Some(UniformValue::Vec3(default_pose.position)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_textured_without_uv_is_rejected_before_upload() {
    let dir = temp_dir("mismatch");
    let photo = photographer(small_config(), ShaderVariant::Textured);

    let mut backend = RecordingBackend::new();
    let result = photo.export_all(&mut backend, &dir, "cam_");
    assert!(matches!(
        result,
        Err(ShutterError::LayoutMismatch {
            variant: ShaderVariant::Textured,
            ..
        })
    ));
    assert!(!backend.calls().iter().any(|c| matches!(c, Call::SetupScene { .. })));
    assert_eq!(backend.calls().last(), Some(&Call::Teardown));
    assert_eq!(backend.allocated_handles(), 0);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_channel_count_follows_target_format() {
    let dir = temp_dir("channels");
    let cases = [
        (PixelFormat::Rgba8, image::ColorType::Rgba8),
        (PixelFormat::Rgb8, image::ColorType::Rgb8),
        (PixelFormat::Other, image::ColorType::Rgb8),
    ];
    for (i, (format, expected)) in cases.into_iter().enumerate() {
        let config = SessionConfig {
            target_format: format,
            ..small_config()
        };
        let photo = photographer(config, ShaderVariant::NoTexture);
        let mut backend = RecordingBackend::new();
        let prefix = format!("fmt{}_", i);
        let written = photo.export_all(&mut backend, &dir, &prefix).unwrap();

        let img = image::open(dir.join(&written[0])).unwrap();
        assert_eq!(img.color(), expected, "{:?}", format);
        assert_eq!((img.width(), img.height()), (8, 6));
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_reported_format_overrides_request() {
    let dir = temp_dir("reported");
    let photo = photographer(small_config(), ShaderVariant::NoTexture);
    let mut backend = RecordingBackend::new().with_reported_format(PixelFormat::Rgba8);
    let written = photo.export_all(&mut backend, &dir, "cam_").unwrap();
    let img = image::open(dir.join(&written[0])).unwrap();
    assert_eq!(img.color(), image::ColorType::Rgba8);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_bottom_up_readback_is_flipped() {
    let dir = temp_dir("flip");
    let photo = photographer(small_config(), ShaderVariant::NoTexture);
    let mut backend = RecordingBackend::new().with_row_order(RowOrder::BottomUp);
    let written = photo.export_all(&mut backend, &dir, "cam_").unwrap();

    let img = image::open(dir.join(&written[0])).unwrap().to_rgb8();
    // Last buffer row (value 255) ends up at the top
    assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(img.get_pixel(0, 5).0, [0, 0, 0]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_failed_write_is_left_out() {
    let dir = temp_dir("write_fail");
    let mut photo = photographer(small_config(), ShaderVariant::NoTexture);
    photo.add_camera_ring(3, 0.0, Some(2.0));
    // A directory where the image should go makes that one write fail
    std::fs::create_dir_all(dir.join("cam_1.png")).unwrap();

    let mut backend = RecordingBackend::new();
    let written = photo.export_all(&mut backend, &dir, "cam_").unwrap();
    assert_eq!(written, vec!["cam_0.png", "cam_2.png"]);
    assert_eq!(backend.allocated_handles(), 0);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_incomplete_target_aborts_export() {
    let dir = temp_dir("incomplete");
    let mut photo = photographer(small_config(), ShaderVariant::NoTexture);
    photo.add_camera_ring(2, 0.0, Some(2.0));

    let mut backend = RecordingBackend::new().with_incomplete_target();
    let result = photo.export_all(&mut backend, &dir, "cam_");
    assert!(matches!(result, Err(ShutterError::IncompleteTarget(_))));
    assert!(!backend.calls().iter().any(|c| matches!(c, Call::Draw { .. })));
    assert_eq!(backend.allocated_handles(), 0);
    assert!(!dir.join("cam_0.png").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_camera_uniforms_per_draw() {
    let dir = temp_dir("uniforms");
    let mut photo = photographer(small_config(), ShaderVariant::NoTexture);
    photo.add_camera_at_position(2.0, 0.0, 0.0, None);
    photo.add_camera_at_position(0.0, 3.0, 0.5, None);

    let mut backend = RecordingBackend::new();
    photo.export_all(&mut backend, &dir, "cam_").unwrap();

    let draws: Vec<_> = backend.draws().collect();
    assert_eq!(draws.len(), 2);
    for ((program, object, uniforms), pose) in draws.iter().zip(photo.cameras()) {
        assert_eq!((*program, *object), (ProgramRole::Main, ObjectRole::Main));
        assert_eq!(uniforms.get("view"), Some(UniformValue::Mat4(pose.view)));
        assert_eq!(uniforms.get("projection"), Some(UniformValue::Mat4(pose.projection)));
        assert_eq!(uniforms.get("eye_pos"), Some(UniformValue::Vec3(pose.position)));
        assert_eq!(uniforms.get("model"), Some(UniformValue::Mat4(Mat4::IDENTITY)));
        assert_eq!(uniforms.get("material.shininess"), Some(UniformValue::Float(64.0)));
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_per_camera_call_sequence() {
    let dir = temp_dir("sequence");
    let mut photo = photographer(small_config(), ShaderVariant::NoTexture);
    photo.add_camera_at_position(2.0, 0.0, 0.0, None);

    let mut backend = RecordingBackend::new();
    photo.export_all(&mut backend, &dir, "cam_").unwrap();

    let calls = backend.calls();
    let start = calls
        .iter()
        .position(|c| *c == Call::BindTarget(TargetKind::Offscreen))
        .unwrap();
    assert!(matches!(calls[start + 1], Call::Clear(_)));
    assert_eq!(calls[start + 2], Call::UseProgram(ProgramRole::Main));
    let draw = calls.iter().position(|c| matches!(c, Call::Draw { .. })).unwrap();
    assert_eq!(calls[draw + 1], Call::BindTarget(TargetKind::Default));
    assert_eq!(calls[draw + 2], Call::ReadColorTarget);
    assert_eq!(calls.last(), Some(&Call::Teardown));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_texture_unit_only_for_sampling_variants() {
    let dir = temp_dir("tex_unit");
    let sets_tex = |backend: &RecordingBackend| {
        backend
            .calls()
            .iter()
            .any(|c| matches!(c, Call::SetUniform { name, .. } if name == "Tex1"))
    };

    let photo = photographer(small_config(), ShaderVariant::NoTexture);
    let mut backend = RecordingBackend::new();
    photo.export_all(&mut backend, &dir, "a_").unwrap();
    assert!(!sets_tex(&backend));

    let photo = photographer(small_config(), ShaderVariant::Default);
    let mut backend = RecordingBackend::new();
    photo.export_all(&mut backend, &dir, "b_").unwrap();
    assert!(sets_tex(&backend));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_calibration_export() {
    let dir = temp_dir("calibration");
    let mut photo = photographer(small_config(), ShaderVariant::NoTexture);
    photo.add_camera_ring(2, 0.0, Some(2.0));

    let paths = photo.export_calibration(&dir, "cam_").unwrap();
    assert_eq!(paths, vec![dir.join("cam_0.json"), dir.join("cam_1.json")]);
    let text = std::fs::read_to_string(&paths[0]).unwrap();
    assert!(text.contains("camera_matrix"));
    assert!(text.contains("opencv-matrix"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_view_frame_draws_a_gizmo_per_camera() {
    let mut photo = photographer(small_config(), ShaderVariant::NoTexture);
    photo.add_camera_ring(3, 0.0, Some(2.0));

    let mut backend = RecordingBackend::new();
    photo.setup_view(&mut backend).unwrap();
    let mut view_camera = photo.default_camera();
    view_camera.set_position(Vec3::new(0.0, 1.0, 4.0));
    photo.render_view_frame(&mut backend, &view_camera).unwrap();

    let draws: Vec<_> = backend.draws().collect();
    assert_eq!(draws.len(), 4);
    assert_eq!(draws[0].1, ObjectRole::Main);
    for ((program, object, uniforms), pose) in draws[1..].iter().zip(photo.cameras()) {
        assert_eq!((*program, *object), (ProgramRole::Gizmo, ObjectRole::Gizmo));
        assert_eq!(uniforms.get("view"), Some(UniformValue::Mat4(view_camera.view_matrix())));
        let Some(UniformValue::Mat4(model)) = uniforms.get("model") else {
            panic!("gizmo model not set");
        };
        assert!((model.w_axis.truncate() - pose.position).length() < 1e-6);
    }

    backend.teardown();
    assert_eq!(backend.allocated_handles(), 0);
}
