//! Window and event loop via winit.
//!
//! [`NeoApp`] implements winit's `ApplicationHandler`: it creates the window
//! and GPU context on `resumed`, feeds keyboard and mouse events into the
//! input resources and the messenger, and on every redraw runs one
//! [`Engine::tick`] and hands the recorded commands to the wgpu backend.

use std::sync::Arc;
use std::time::Instant;

use glam::{UVec2, Vec2};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::engine::Engine;
use crate::error::{NeoError, Result};
use crate::input::{Input, KeyCode, Mouse, MouseButton};
use crate::library::Library;
use crate::messaging::{KeyMessage, MouseButtonMessage, Messenger, WindowFrameSizeMessage};
use crate::render::{GpuContext, WgpuBackend};

/// Scroll lines per pixel of touchpad scroll.
const PIXELS_PER_LINE: f32 = 20.0;

/// Frames longer than this (breakpoints, window drags) are clamped.
const MAX_FRAME_SECS: f32 = 0.25;

struct Graphics {
    window: Arc<Window>,
    gpu: GpuContext,
    backend: WgpuBackend,
}

pub(crate) struct NeoApp {
    engine: Engine,
    graphics: Option<Graphics>,
    last_frame: Option<Instant>,
    error: Option<NeoError>,
}

/// Runs `engine` in a window until it is closed.
pub(crate) fn run(engine: Engine) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|e| NeoError::Window(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = NeoApp {
        engine,
        graphics: None,
        last_frame: None,
        error: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| NeoError::Window(e.to_string()))?;

    app.engine.shutdown_systems();
    log::info!("engine stopped");
    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl NeoApp {
    fn create_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<Graphics> {
        let config = self.engine.config();
        let attrs = Window::default_attributes()
            .with_title(config.app_name.as_str())
            .with_inner_size(PhysicalSize::new(config.width.max(1), config.height.max(1)));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| NeoError::Window(e.to_string()))?,
        );
        let gpu = GpuContext::new(window.clone(), config.vsync)?;
        let backend = WgpuBackend::new(&gpu);
        Ok(Graphics { window, gpu, backend })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: NeoError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn announce_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.engine
            .world_mut()
            .resource_mut::<Messenger>()
            .send(WindowFrameSizeMessage {
                size: UVec2::new(width, height),
            });
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = self
            .last_frame
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32())
            .min(MAX_FRAME_SECS);
        self.last_frame = Some(now);

        let report = self.engine.tick(dt);

        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };
        let library = self.engine.world().resource::<Library>();
        match graphics.backend.render(&graphics.gpu, library, &report.commands) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (w, h) = graphics.gpu.surface_size();
                graphics.gpu.resize(w, h);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, NeoError::Gpu("out of GPU memory".into()));
                return;
            }
            Err(e) => log::warn!("surface error: {e:?}"),
        }
        graphics.window.request_redraw();
    }
}

impl ApplicationHandler for NeoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        match self.create_graphics(event_loop) {
            Ok(graphics) => {
                let size = graphics.window.inner_size();
                graphics.window.request_redraw();
                self.graphics = Some(graphics);
                self.announce_size(size.width, size.height);
                self.engine.init_systems();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("window close requested");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(graphics) = self.graphics.as_mut() {
                    graphics.gpu.resize(size.width, size.height);
                }
                self.announce_size(size.width, size.height);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return;
                };
                let pressed = event.state == ElementState::Pressed;
                if pressed && key == KeyCode::Escape {
                    event_loop.exit();
                    return;
                }
                let world = self.engine.world_mut();
                let keys = world.resource_mut::<Input<KeyCode>>();
                if pressed {
                    keys.press(key);
                } else {
                    keys.release(key);
                }
                if !event.repeat {
                    world.resource_mut::<Messenger>().send(KeyMessage { key, pressed });
                }
            }

            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                let world = self.engine.world_mut();
                let buttons = world.resource_mut::<Input<MouseButton>>();
                if pressed {
                    buttons.press(button);
                } else {
                    buttons.release(button);
                }
                world
                    .resource_mut::<Messenger>()
                    .send(MouseButtonMessage { button, pressed });
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.engine
                    .world_mut()
                    .resource_mut::<Mouse>()
                    .move_to(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                self.engine.world_mut().resource_mut::<Mouse>().scroll_by(lines);
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
