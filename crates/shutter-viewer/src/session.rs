//! Interactive viewer application

use crate::clock::FrameClock;
use crate::input::InputState;
use anyhow::{Context, Result};
use shutter_core::Camera;
use shutter_render::{Photographer, RenderBackend, WgpuBackend};
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

/// Open a window on the photographer's scene and run until it is closed.
/// With `loop_frames` false a single frame is rendered before exiting.
pub fn view_scene(photographer: &Photographer, loop_frames: bool) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(photographer, loop_frames);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Window, backend and fly camera for one viewing session
pub struct ViewerApp<'a> {
    photographer: &'a Photographer,
    loop_frames: bool,
    window: Option<Arc<Window>>,
    backend: Option<WgpuBackend>,
    camera: Camera,
    input: InputState,
    cursor_captured: bool,
    clock: FrameClock,
    frames: u64,
    error: Option<anyhow::Error>,
}

impl<'a> ViewerApp<'a> {
    pub fn new(photographer: &'a Photographer, loop_frames: bool) -> Self {
        Self {
            photographer,
            loop_frames,
            window: None,
            backend: None,
            camera: photographer.default_camera(),
            input: InputState::new(),
            cursor_captured: false,
            clock: FrameClock::new(),
            frames: 0,
            error: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let config = self.photographer.config();
        let window_attrs = Window::default_attributes()
            .with_title("Shutter")
            .with_inner_size(PhysicalSize::new(config.width, config.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create viewer window")?,
        );
        self.window = Some(window.clone());
        self.capture_cursor(&window);

        let size = window.inner_size();
        let mut backend = WgpuBackend::for_window(window).context("Failed to initialize viewer backend")?;
        self.photographer
            .setup_view(&mut backend)
            .context("Failed to upload scene")?;
        self.backend = Some(backend);

        self.camera.set_viewport(size.width.max(1), size.height.max(1));
        log::info!(
            "Viewing {} camera(s); Q/E forward/back, W/S up/down, A/D strafe, Esc quits",
            self.photographer.cameras().len()
        );
        Ok(())
    }

    /// Hide the cursor and keep it in the window for mouse-look
    fn capture_cursor(&mut self, window: &Window) {
        let grab = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        match grab {
            Ok(()) => self.cursor_captured = true,
            Err(e) => log::warn!("Cursor capture unavailable, using cursor positions: {}", e),
        }
        window.set_cursor_visible(false);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        self.clock.tick();
        let dt = self.clock.delta_time as f32;
        for direction in self.input.movement() {
            self.camera.move_position(direction, dt);
        }
        self.camera.zoom(self.input.take_scroll());

        let Some(backend) = &mut self.backend else {
            return;
        };
        let result = self
            .photographer
            .render_view_frame(backend, &self.camera)
            .and_then(|()| backend.present());
        if let Err(e) = result {
            self.fail(event_loop, anyhow::Error::new(e).context("Failed to render frame"));
            return;
        }

        self.frames += 1;
        if !self.loop_frames {
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for ViewerApp<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.initialize(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(backend) = &mut self.backend {
                    backend.resize(size.width, size.height);
                }
                if size.width > 0 && size.height > 0 {
                    self.camera.set_viewport(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed if code == KeyCode::Escape => event_loop.exit(),
                        ElementState::Pressed => self.input.process_key_down(code),
                        ElementState::Released => self.input.process_key_up(code),
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } if !self.cursor_captured => {
                if let Some((pitch, yaw)) = self.input.process_cursor(position.x, position.y) {
                    self.camera.update_rotation(pitch, yaw);
                }
            }

            WindowEvent::CursorLeft { .. } => {
                self.input.reset_cursor();
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.input.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.render(event_loop);
            }

            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if !self.cursor_captured {
            return;
        }
        if let DeviceEvent::MouseMotion { delta } = event {
            let (pitch, yaw) = InputState::motion_offset(delta.0, delta.1);
            self.camera.update_rotation(pitch, yaw);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(backend) = &mut self.backend {
            backend.teardown();
        }
        log::info!("Viewer closed after {} frame(s)", self.frames);
    }
}
