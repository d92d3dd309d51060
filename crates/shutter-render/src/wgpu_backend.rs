//! GPU backend
//!
//! wgpu has no global bind-then-draw state, so the backend keeps one: draws
//! are queued on the pending pass of the bound target, each with a snapshot
//! of its program's uniforms, and the pass is submitted when the target
//! changes, a clear follows draws, or pixels are read or presented.

use crate::backend::{ObjectRole, ProgramRole, RenderBackend, SceneSetup, TargetKind};
use crate::context::{GpuContext, RenderError, OFFSCREEN_FORMAT};
use crate::readback::{read_texture_rgba, RowOrder, TargetPixels};
use crate::resources::{GpuSlot, MeshBuffers, SharedBindings};
use crate::shader::ShaderProgram;
use crate::target::OffscreenTarget;
use crate::uniforms::{UniformBlock, UniformValue, UNIFORM_BLOCK_SIZE, UNIFORM_STRIDE};
use shutter_core::{PixelFormat, Result, ShaderPair, ShutterError};
use std::path::PathBuf;
use std::sync::Arc;
use winit::window::Window;

struct DrawCommand {
    program: ProgramRole,
    object: ObjectRole,
    uniforms: UniformBlock,
}

struct PendingPass {
    target: TargetKind,
    clear: Option<[f32; 4]>,
    draws: Vec<DrawCommand>,
}

impl PendingPass {
    fn is_empty(&self) -> bool {
        self.clear.is_none() && self.draws.is_empty()
    }
}

pub struct WgpuBackend {
    gpu: GpuContext,
    bindings: SharedBindings,
    main_program: GpuSlot<ShaderProgram>,
    gizmo_program: GpuSlot<ShaderProgram>,
    main_object: MeshBuffers,
    gizmo_object: MeshBuffers,
    offscreen: OffscreenTarget,
    current_program: ProgramRole,
    pending: PendingPass,
    frame: Option<wgpu::SurfaceTexture>,
    shader_files: Option<(PathBuf, PathBuf)>,
}

impl WgpuBackend {
    pub fn new(gpu: GpuContext) -> Self {
        let bindings = SharedBindings::new(&gpu);
        Self {
            gpu,
            bindings,
            main_program: GpuSlot::new("main program"),
            gizmo_program: GpuSlot::new("gizmo program"),
            main_object: MeshBuffers::new(),
            gizmo_object: MeshBuffers::new(),
            offscreen: OffscreenTarget::new(),
            current_program: ProgramRole::Main,
            pending: PendingPass {
                target: TargetKind::Default,
                clear: None,
                draws: Vec::new(),
            },
            frame: None,
            shader_files: None,
        }
    }

    /// Backend without a window
    pub fn headless() -> Result<Self> {
        let gpu = pollster::block_on(GpuContext::headless())?;
        Ok(Self::new(gpu))
    }

    /// Backend presenting its default target to `window`
    pub fn for_window(window: Arc<Window>) -> Result<Self> {
        let gpu = pollster::block_on(GpuContext::for_window(window))?;
        Ok(Self::new(gpu))
    }

    /// Build the main program from WGSL stage files instead of the built-in
    /// variants. The vertex layout still comes from the shader pair.
    pub fn with_shader_files(mut self, vertex: PathBuf, fragment: PathBuf) -> Self {
        self.shader_files = Some((vertex, fragment));
        self
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    fn program_slot(&self, role: ProgramRole) -> &GpuSlot<ShaderProgram> {
        match role {
            ProgramRole::Main => &self.main_program,
            ProgramRole::Gizmo => &self.gizmo_program,
        }
    }

    fn object_buffers(&self, role: ObjectRole) -> &MeshBuffers {
        match role {
            ObjectRole::Main => &self.main_object,
            ObjectRole::Gizmo => &self.gizmo_object,
        }
    }

    fn build_program(&self, role: ProgramRole, pair: ShaderPair) -> ShaderProgram {
        let formats = self.gpu.target_formats();
        match (&self.shader_files, role) {
            (Some((vertex, fragment)), ProgramRole::Main) => {
                ShaderProgram::from_files(&self.gpu, &self.bindings, vertex, fragment, pair.layout(), &formats)
            }
            _ => ShaderProgram::new(&self.gpu, &self.bindings, pair, &formats),
        }
    }

    /// Color view and format of the pending target, or `None`
    /// when there is nothing to draw into
    fn acquire_target(&mut self) -> Result<Option<(wgpu::TextureView, wgpu::TextureFormat)>> {
        match self.pending.target {
            TargetKind::Offscreen => {
                self.offscreen.check_complete()?;
                let view = self
                    .offscreen
                    .color_texture()
                    .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()));
                Ok(view.map(|v| (v, OFFSCREEN_FORMAT)))
            }
            TargetKind::Default => {
                let Some(state) = &self.gpu.surface else {
                    log::trace!("No window surface, discarding default target pass");
                    return Ok(None);
                };
                if self.frame.is_none() {
                    match state.surface.get_current_texture() {
                        Ok(frame) => self.frame = Some(frame),
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            let (w, h) = (state.config.width, state.config.height);
                            self.gpu.resize(w, h);
                            log::debug!("Surface lost, reconfigured; skipping frame");
                            return Ok(None);
                        }
                        Err(e) => return Err(RenderError::SurfaceError(e.to_string()).into()),
                    }
                }
                let format = state.config.format;
                let view = self
                    .frame
                    .as_ref()
                    .map(|f| f.texture.create_view(&wgpu::TextureViewDescriptor::default()));
                Ok(view.map(|v| (v, format)))
            }
        }
    }

    /// Submit the pending pass of the bound target
    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let clear = self.pending.clear.take();
        let draws = std::mem::take(&mut self.pending.draws);

        let Some((color_view, format)) = self.acquire_target()? else {
            return Ok(());
        };
        let depth_view = match self.pending.target {
            TargetKind::Offscreen => self.offscreen.depth_view(),
            TargetKind::Default => self.gpu.surface.as_ref().map(|s| &s.depth_view),
        };
        let Some(depth_view) = depth_view else {
            return Err(ShutterError::IncompleteTarget("no depth attachment".into()));
        };

        let device = &self.gpu.device;
        let uniform_buffer = (!draws.is_empty()).then(|| {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Draw Uniforms"),
                size: draws.len() as u64 * UNIFORM_STRIDE as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            for (i, draw) in draws.iter().enumerate() {
                self.gpu
                    .queue
                    .write_buffer(&buffer, i as u64 * UNIFORM_STRIDE as u64, draw.uniforms.as_bytes());
            }
            buffer
        });

        let bind_groups: Vec<wgpu::BindGroup> = match &uniform_buffer {
            Some(buffer) => draws
                .iter()
                .map(|draw| {
                    let texture = self.object_buffers(draw.object).texture_view();
                    self.bindings.bind_group(device, buffer, texture)
                })
                .collect(),
            None => Vec::new(),
        };

        let color_load = match clear {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Shutter Pass Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shutter Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: if clear.is_some() { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: if clear.is_some() { wgpu::LoadOp::Clear(0) } else { wgpu::LoadOp::Load },
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (i, (draw, bind_group)) in draws.iter().zip(&bind_groups).enumerate() {
                let program = self.program_slot(draw.program).get();
                let Some(pipeline) = program.and_then(|p| p.pipeline(format)) else {
                    log::warn!("Skipping draw of {:?}: program {:?} is not usable", draw.object, draw.program);
                    continue;
                };
                let buffers = self.object_buffers(draw.object);
                let Some(vertex) = buffers.vertex.get() else {
                    log::warn!("Skipping draw of {:?}: nothing uploaded", draw.object);
                    continue;
                };

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, bind_group, &[i as u32 * UNIFORM_STRIDE]);
                pass.set_vertex_buffer(0, vertex.slice(..));
                match buffers.index.get() {
                    Some(index) => {
                        pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..buffers.draw_count(), 0, 0..1);
                    }
                    None => pass.draw(0..buffers.draw_count(), 0..1),
                }
            }
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn setup_scene(&mut self, scene: &SceneSetup<'_>) -> Result<()> {
        let program = self.build_program(ProgramRole::Main, scene.pair);
        self.main_program.allocate(program)?;
        self.main_object.upload(&self.gpu, &scene.object)?;

        if let Some(gizmo) = &scene.gizmo {
            let program = self.build_program(ProgramRole::Gizmo, ShaderPair::GIZMO);
            self.gizmo_program.allocate(program)?;
            self.gizmo_object.upload(&self.gpu, gizmo)?;
        }
        log::debug!("Scene set up, {} GPU handles live", self.allocated_handles());
        Ok(())
    }

    fn setup_offscreen_target(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<()> {
        self.offscreen.setup(&self.gpu, width, height, format)
    }

    fn bind_target(&mut self, target: TargetKind) -> Result<()> {
        if target == TargetKind::Offscreen {
            self.offscreen.check_complete()?;
        }
        if target != self.pending.target {
            self.flush()?;
            self.pending.target = target;
        }
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4]) {
        if !self.pending.draws.is_empty() {
            if let Err(e) = self.flush() {
                log::error!("Failed to submit pass before clear: {}", e);
            }
        }
        self.pending.clear = Some(color);
    }

    fn use_program(&mut self, program: ProgramRole) {
        self.current_program = program;
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        let slot = match self.current_program {
            ProgramRole::Main => &mut self.main_program,
            ProgramRole::Gizmo => &mut self.gizmo_program,
        };
        let slot_name = slot.name();
        match slot.get_mut() {
            Some(program) => program.set_uniform(name, value),
            None => log::trace!("Uniform '{}' set with no {} built", name, slot_name),
        }
    }

    fn draw_object(&mut self, object: ObjectRole) -> Result<()> {
        let Some(program) = self.program_slot(self.current_program).get() else {
            return Err(ShutterError::RenderError(format!(
                "draw of {:?} with no {:?} program",
                object, self.current_program
            )));
        };
        if self.object_buffers(object).layout().is_none() {
            return Err(ShutterError::RenderError(format!("draw of {:?} before upload", object)));
        }
        debug_assert!(program.uniforms().as_bytes().len() == UNIFORM_BLOCK_SIZE);
        let uniforms = program.uniforms().clone();
        self.pending.draws.push(DrawCommand {
            program: self.current_program,
            object,
            uniforms,
        });
        Ok(())
    }

    fn read_color_target(&mut self) -> Result<TargetPixels> {
        self.flush()?;
        self.offscreen.check_complete()?;
        let Some(texture) = self.offscreen.color_texture() else {
            return Err(ShutterError::IncompleteTarget("no color attachment".into()));
        };
        let (width, height) = self.offscreen.size();
        let rgba = read_texture_rgba(&self.gpu, texture, width, height)?;
        Ok(TargetPixels {
            width,
            height,
            internal_format: self.offscreen.format(),
            row_order: RowOrder::TopDown,
            rgba,
        })
    }

    fn present(&mut self) -> Result<()> {
        self.flush()?;
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.frame = None;
        self.gpu.resize(width, height);
    }

    fn teardown(&mut self) {
        self.pending.clear = None;
        self.pending.draws.clear();
        self.frame = None;

        self.offscreen.release();
        self.main_object.release();
        self.gizmo_object.release();
        self.main_program.release();
        self.gizmo_program.release();
        log::debug!("GPU resources released");
    }

    fn allocated_handles(&self) -> usize {
        self.main_program.count()
            + self.gizmo_program.count()
            + self.main_object.allocated_handles()
            + self.gizmo_object.allocated_handles()
            + self.offscreen.allocated_handles()
    }
}
