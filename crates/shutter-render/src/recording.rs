//! Backend that records calls instead of touching a GPU
//!
//! Used for `--dry-run` and for exercising the orchestrator in tests. Handles
//! are tracked with the same [`GpuSlot`]s as the GPU backend, so double
//! allocation and teardown behave the same way.

use crate::backend::{ObjectRole, ProgramRole, RenderBackend, RowOrder, SceneSetup, TargetKind, TargetPixels};
use crate::resources::GpuSlot;
use crate::uniforms::{UniformBlock, UniformValue};
use shutter_core::{PixelFormat, Result, ShaderPair, ShutterError};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetupScene {
        pair: ShaderPair,
        vertex_count: u32,
        gizmo: bool,
    },
    SetupOffscreenTarget {
        width: u32,
        height: u32,
        format: PixelFormat,
    },
    BindTarget(TargetKind),
    Clear([f32; 4]),
    UseProgram(ProgramRole),
    SetUniform {
        program: ProgramRole,
        name: String,
        value: UniformValue,
    },
    Draw {
        program: ProgramRole,
        object: ObjectRole,
        uniforms: UniformBlock,
    },
    ReadColorTarget,
    Present,
    Resize(u32, u32),
    Teardown,
}

pub struct RecordingBackend {
    calls: Vec<Call>,
    main_program: GpuSlot<UniformBlock>,
    gizmo_program: GpuSlot<UniformBlock>,
    main_object: GpuSlot<u32>,
    gizmo_object: GpuSlot<u32>,
    target: GpuSlot<(u32, u32)>,
    target_format: PixelFormat,
    current_program: ProgramRole,
    bound: TargetKind,
    clear_color: [f32; 4],
    reported_format: Option<PixelFormat>,
    row_order: RowOrder,
    fail_target: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            main_program: GpuSlot::new("main program"),
            gizmo_program: GpuSlot::new("gizmo program"),
            main_object: GpuSlot::new("object buffers"),
            gizmo_object: GpuSlot::new("gizmo buffers"),
            target: GpuSlot::new("offscreen target"),
            target_format: PixelFormat::Rgb8,
            current_program: ProgramRole::Main,
            bound: TargetKind::Default,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            reported_format: None,
            row_order: RowOrder::TopDown,
            fail_target: false,
        }
    }

    /// Report `format` on readback instead of the requested one
    pub fn with_reported_format(mut self, format: PixelFormat) -> Self {
        self.reported_format = Some(format);
        self
    }

    /// Return readbacks in `order`. Bottom-up readbacks are filled with a
    /// per-row gradient running from 0 on the first buffer row to 255 on the
    /// last, so a missing flip is visible.
    pub fn with_row_order(mut self, order: RowOrder) -> Self {
        self.row_order = order;
        self
    }

    /// Make every offscreen target incomplete
    pub fn with_incomplete_target(mut self) -> Self {
        self.fail_target = true;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    /// Recorded draws with the uniforms they were issued with
    pub fn draws(&self) -> impl Iterator<Item = (ProgramRole, ObjectRole, &UniformBlock)> {
        self.calls.iter().filter_map(|call| match call {
            Call::Draw {
                program,
                object,
                uniforms,
            } => Some((*program, *object, uniforms)),
            _ => None,
        })
    }

    fn program_slot(&self, role: ProgramRole) -> &GpuSlot<UniformBlock> {
        match role {
            ProgramRole::Main => &self.main_program,
            ProgramRole::Gizmo => &self.gizmo_program,
        }
    }

    fn object_slot(&self, role: ObjectRole) -> &GpuSlot<u32> {
        match role {
            ObjectRole::Main => &self.main_object,
            ObjectRole::Gizmo => &self.gizmo_object,
        }
    }

    fn incomplete(&self) -> ShutterError {
        ShutterError::IncompleteTarget("recording backend has no complete offscreen target".into())
    }
}

impl RenderBackend for RecordingBackend {
    fn setup_scene(&mut self, scene: &SceneSetup<'_>) -> Result<()> {
        self.calls.push(Call::SetupScene {
            pair: scene.pair,
            vertex_count: scene.object.draw_count(),
            gizmo: scene.gizmo.is_some(),
        });
        self.main_program.allocate(UniformBlock::new())?;
        self.main_object.allocate(scene.object.draw_count())?;
        if let Some(gizmo) = &scene.gizmo {
            self.gizmo_program.allocate(UniformBlock::new())?;
            self.gizmo_object.allocate(gizmo.draw_count())?;
        }
        Ok(())
    }

    fn setup_offscreen_target(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<()> {
        self.calls.push(Call::SetupOffscreenTarget { width, height, format });
        self.target_format = format;
        if self.target.get() == Some(&(width, height)) {
            return Ok(());
        }
        self.target.release();
        if self.fail_target || width == 0 || height == 0 {
            return Err(self.incomplete());
        }
        self.target.allocate((width, height))?;
        Ok(())
    }

    fn bind_target(&mut self, target: TargetKind) -> Result<()> {
        self.calls.push(Call::BindTarget(target));
        if target == TargetKind::Offscreen && !self.target.is_allocated() {
            return Err(self.incomplete());
        }
        self.bound = target;
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(Call::Clear(color));
        if self.bound == TargetKind::Offscreen {
            self.clear_color = color;
        }
    }

    fn use_program(&mut self, program: ProgramRole) {
        self.calls.push(Call::UseProgram(program));
        self.current_program = program;
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.calls.push(Call::SetUniform {
            program: self.current_program,
            name: name.to_string(),
            value,
        });
        let slot = match self.current_program {
            ProgramRole::Main => &mut self.main_program,
            ProgramRole::Gizmo => &mut self.gizmo_program,
        };
        if let Some(block) = slot.get_mut() {
            block.set(name, value);
        }
    }

    fn draw_object(&mut self, object: ObjectRole) -> Result<()> {
        let Some(uniforms) = self.program_slot(self.current_program).get().cloned() else {
            return Err(ShutterError::RenderError(format!(
                "draw of {:?} with no {:?} program",
                object, self.current_program
            )));
        };
        if !self.object_slot(object).is_allocated() {
            return Err(ShutterError::RenderError(format!("draw of {:?} before upload", object)));
        }
        self.calls.push(Call::Draw {
            program: self.current_program,
            object,
            uniforms,
        });
        Ok(())
    }

    fn read_color_target(&mut self) -> Result<TargetPixels> {
        self.calls.push(Call::ReadColorTarget);
        let Some(&(width, height)) = self.target.get() else {
            return Err(self.incomplete());
        };
        let format = self.reported_format.unwrap_or(self.target_format);

        match self.row_order {
            RowOrder::TopDown => {
                let rgba = self.clear_color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
                Ok(TargetPixels::filled(width, height, format, rgba))
            }
            RowOrder::BottomUp => {
                let rgba = (0..height)
                    .flat_map(|row| {
                        // Spread over 0..=255 so tall targets never repeat a value
                        let v = (u64::from(row) * 255 / u64::from(height.saturating_sub(1).max(1))) as u8;
                        [v, v, v, 255].repeat(width as usize)
                    })
                    .collect();
                Ok(TargetPixels {
                    width,
                    height,
                    internal_format: format,
                    row_order: RowOrder::BottomUp,
                    rgba,
                })
            }
        }
    }

    fn present(&mut self) -> Result<()> {
        self.calls.push(Call::Present);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Resize(width, height));
    }

    fn teardown(&mut self) {
        self.calls.push(Call::Teardown);
        self.main_program.release();
        self.gizmo_program.release();
        self.main_object.release();
        self.gizmo_object.release();
        self.target.release();
    }

    fn allocated_handles(&self) -> usize {
        self.main_program.count()
            + self.gizmo_program.count()
            + self.main_object.count()
            + self.gizmo_object.count()
            // color and depth attachments
            + 2 * self.target.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use shutter_core::{MeshData, ShaderVariant};

    fn setup(backend: &mut RecordingBackend, mesh: &MeshData) -> Result<()> {
        let pair = ShaderPair::new(ShaderVariant::NoTexture, ShaderVariant::NoTexture);
        backend.setup_scene(&SceneSetup {
            pair,
            object: mesh.pack(pair.vertex)?,
            gizmo: None,
        })
    }

    #[test]
    fn test_double_setup_is_rejected() {
        let mesh = MeshData::unit_cube();
        let mut backend = RecordingBackend::new();
        setup(&mut backend, &mesh).unwrap();
        let handles = backend.allocated_handles();

        let result = setup(&mut backend, &mesh);
        assert!(matches!(result, Err(ShutterError::AlreadyAllocated(_))));
        assert_eq!(backend.allocated_handles(), handles);
    }

    #[test]
    fn test_draw_snapshots_uniforms() {
        let mesh = MeshData::unit_cube();
        let mut backend = RecordingBackend::new();
        setup(&mut backend, &mesh).unwrap();

        backend.use_program(ProgramRole::Main);
        backend.set_uniform("eye_pos", Vec3::X.into());
        backend.draw_object(ObjectRole::Main).unwrap();
        backend.set_uniform("eye_pos", Vec3::Y.into());
        backend.draw_object(ObjectRole::Main).unwrap();

        let eyes: Vec<_> = backend.draws().map(|(_, _, u)| u.get("eye_pos")).collect();
        assert_eq!(
            eyes,
            vec![Some(UniformValue::Vec3(Vec3::X)), Some(UniformValue::Vec3(Vec3::Y))]
        );
    }

    #[test]
    fn test_draw_without_gizmo_upload_fails() {
        let mesh = MeshData::unit_cube();
        let mut backend = RecordingBackend::new();
        setup(&mut backend, &mesh).unwrap();
        backend.use_program(ProgramRole::Gizmo);
        assert!(backend.draw_object(ObjectRole::Gizmo).is_err());
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mesh = MeshData::unit_cube();
        let mut backend = RecordingBackend::new();
        setup(&mut backend, &mesh).unwrap();
        backend.setup_offscreen_target(4, 4, PixelFormat::Rgb8).unwrap();
        assert_eq!(backend.allocated_handles(), 4);

        backend.teardown();
        assert_eq!(backend.allocated_handles(), 0);
        backend.teardown();
        assert_eq!(backend.allocated_handles(), 0);
    }

    #[test]
    fn test_incomplete_target() {
        let mut backend = RecordingBackend::new().with_incomplete_target();
        let result = backend.setup_offscreen_target(4, 4, PixelFormat::Rgb8);
        assert!(matches!(result, Err(ShutterError::IncompleteTarget(_))));
        assert!(backend.bind_target(TargetKind::Offscreen).is_err());
        assert_eq!(backend.allocated_handles(), 0);
    }

    #[test]
    fn test_readback_uses_clear_color() {
        let mut backend = RecordingBackend::new();
        backend.setup_offscreen_target(2, 1, PixelFormat::Rgba8).unwrap();
        backend.bind_target(TargetKind::Offscreen).unwrap();
        backend.clear([1.0, 0.0, 0.0, 1.0]);
        let pixels = backend.read_color_target().unwrap();
        assert_eq!(pixels.rgba, vec![255, 0, 0, 255, 255, 0, 0, 255]);
        assert_eq!(pixels.internal_format, PixelFormat::Rgba8);
    }

    #[test]
    fn test_bottom_up_gradient_spans_tall_targets() {
        let mut backend = RecordingBackend::new().with_row_order(RowOrder::BottomUp);
        backend.setup_offscreen_target(1, 300, PixelFormat::Rgba8).unwrap();
        let pixels = backend.read_color_target().unwrap();
        let values: Vec<u8> = pixels.rgba.chunks_exact(4).map(|px| px[0]).collect();

        assert_eq!(values.len(), 300);
        assert_eq!(values[0], 0);
        assert_eq!(values[299], 255);
        assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_ne!(values[256], values[0]);
    }
}
