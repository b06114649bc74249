//! # Engine: The Frame Loop
//!
//! [`Engine`] owns the world, the system schedule and the renderer, and
//! defines what one frame is:
//!
//! ```text
//! tick(dt)
//!   ├─ Time.advance(dt)
//!   ├─ Messenger::relay         messages sent last frame
//!   ├─ Schedule::run            systems, registration order
//!   ├─ Renderer::render         pre-process ─► scene ─► post-process
//!   ├─ World::flush_kill_queue  queued removals, then drop their receivers
//!   ├─ clear per-frame input    just_pressed / mouse delta / scroll
//!   └─ diagnostics (10 Hz)
//! ```
//!
//! `tick` needs no window or GPU, so tests and headless tools drive it
//! directly and inspect the returned [`FrameReport`]. [`Engine::run`] opens a
//! window and calls `tick` on every redraw.

use std::time::Duration;

use glam::Vec3;

use crate::component::{CameraComponent, MainCameraComponent, Renderable, ShaderAttachments, SpatialComponent};
use crate::config::EngineConfig;
use crate::ecs::{GameObject, Schedule, SpawnBundle, System, World};
use crate::error::Result;
use crate::input::{Input, KeyCode, Mouse, MouseButton};
use crate::library::Library;
use crate::messaging::Messenger;
use crate::render::{FrameSize, RenderCommand, RenderStats, Renderer, Shader};
use crate::time::Time;

/// What a single [`Engine::tick`] did.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Commands recorded by the renderer, in submission order.
    pub commands: Vec<RenderCommand>,
    /// Per-shader statistics for this frame.
    pub stats: RenderStats,
    /// Messages delivered before the systems ran.
    pub messages: usize,
    /// Objects destroyed by the kill queue at the end of the frame.
    pub destroyed: Vec<GameObject>,
}

pub struct Engine {
    config: EngineConfig,
    world: World,
    schedule: Schedule,
    renderer: Renderer,
    #[cfg(feature = "diagnostics")]
    budget: crate::diag::FrameBudget,
}

impl Engine {
    /// Builds an engine with the core resources in place and a default
    /// perspective camera at `(0, 0.6, 5)`.
    pub fn new(config: EngineConfig) -> Self {
        let mut world = World::new();
        world.insert_resource(Time::new());
        world.insert_resource(Input::<KeyCode>::new());
        world.insert_resource(Input::<MouseButton>::new());
        world.insert_resource(Mouse::default());
        world.insert_resource(FrameSize(glam::UVec2::new(config.width.max(1), config.height.max(1))));
        world.insert_resource(Library::new());
        world.insert_resource(Messenger::new());
        world.insert_resource(ShaderAttachments::new());
        world.insert_resource(RenderStats::default());

        let camera = world.spawn((
            SpatialComponent::at(Vec3::new(0.0, 0.6, 5.0)),
            CameraComponent::perspective(45.0, 0.1, 100.0),
            MainCameraComponent,
        ));
        let renderer = Renderer::new(camera, config.clear_color);

        #[cfg(feature = "diagnostics")]
        if config.attach_diagnostics {
            if let Some(sender) = crate::diag::DiagSender::new() {
                world.insert_resource(sender);
            }
        }

        log::info!("engine `{}` ready ({}x{})", config.app_name, config.width, config.height);
        Self {
            config,
            world,
            schedule: Schedule::new(),
            renderer,
            #[cfg(feature = "diagnostics")]
            budget: crate::diag::FrameBudget::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }

    /// The library resource, for registering meshes and textures.
    pub fn library_mut(&mut self) -> &mut Library {
        self.world.resource_mut::<Library>()
    }

    pub fn messenger_mut(&mut self) -> &mut Messenger {
        self.world.resource_mut::<Messenger>()
    }

    // ── Game Objects ─────────────────────────────────────────────────

    pub fn create_game_object(&mut self) -> GameObject {
        self.world.create_game_object()
    }

    pub fn spawn<B: SpawnBundle>(&mut self, bundle: B) -> GameObject {
        self.world.spawn(bundle)
    }

    /// Adds or replaces a component.
    pub fn add_component<T: 'static + Send + Sync>(&mut self, object: GameObject, component: T) {
        self.world.insert(object, component);
    }

    /// Attaches `object` to shader `S`.
    pub fn add_renderable<S: Shader>(&mut self, object: GameObject) {
        self.world.insert(object, Renderable::<S>::new());
    }

    /// Removes a component at the end of the current frame.
    pub fn remove_component<T: 'static + Send + Sync>(&mut self, object: GameObject) {
        self.world.queue_remove::<T>(object);
    }

    /// Destroys an object and all its components at the end of the current
    /// frame.
    pub fn remove_game_object(&mut self, object: GameObject) {
        self.world.queue_destroy(object);
    }

    // ── Systems ──────────────────────────────────────────────────────

    pub fn add_system<S: System>(&mut self, system: S) {
        self.schedule.add_system(system);
    }

    /// Runs `init` on systems that have not been initialized. `tick` does
    /// this too; calling it up front lets setup code see the results.
    pub fn init_systems(&mut self) {
        self.schedule.init(&mut self.world);
    }

    pub fn system<S: System>(&self) -> Option<&S> {
        self.schedule.get::<S>()
    }

    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.schedule.get_mut::<S>()
    }

    pub fn shutdown_systems(&mut self) {
        self.schedule.shutdown(&mut self.world);
    }

    // ── Frame ────────────────────────────────────────────────────────

    /// Runs one frame of length `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> FrameReport {
        let dt = dt.max(0.0);
        if let Some(time) = self.world.get_resource_mut::<Time>() {
            time.advance(Duration::from_secs_f32(dt));
        }

        let messages = Messenger::relay(&mut self.world);

        #[cfg(feature = "diagnostics")]
        let systems_start = std::time::Instant::now();
        self.schedule.run(&mut self.world, dt);
        #[cfg(feature = "diagnostics")]
        let render_start = std::time::Instant::now();
        let commands = self.renderer.render(&mut self.world);
        #[cfg(feature = "diagnostics")]
        {
            self.budget = crate::diag::FrameBudget {
                systems_us: render_start.duration_since(systems_start).as_secs_f64() * 1_000_000.0,
                render_us: render_start.elapsed().as_secs_f64() * 1_000_000.0,
            };
        }

        let destroyed = self.world.flush_kill_queue();
        if !destroyed.is_empty() {
            let messenger = self.world.resource_mut::<Messenger>();
            for &object in &destroyed {
                messenger.remove_receivers(object);
            }
            log::debug!("kill queue destroyed {} game objects", destroyed.len());
        }

        self.clear_frame_input();

        #[cfg(feature = "diagnostics")]
        crate::diag::send_diagnostics(&mut self.world, &self.config.app_name, &self.schedule.timings, self.budget);

        FrameReport {
            commands,
            stats: self.world.get_resource::<RenderStats>().cloned().unwrap_or_default(),
            messages,
            destroyed,
        }
    }

    fn clear_frame_input(&mut self) {
        if let Some(keys) = self.world.get_resource_mut::<Input<KeyCode>>() {
            keys.clear_just();
        }
        if let Some(buttons) = self.world.get_resource_mut::<Input<MouseButton>>() {
            buttons.clear_just();
        }
        if let Some(mouse) = self.world.get_resource_mut::<Mouse>() {
            mouse.clear_frame();
        }
    }

    /// Opens the window and runs until it is closed. Every system's
    /// `shutdown` is called before returning.
    pub fn run(self) -> Result<()> {
        crate::window::run(self)
    }
}

/// Installs the diagnostics logger when the feature is on, plain
/// env_logger otherwise. Safe to call more than once.
pub fn init_logging() {
    #[cfg(feature = "diagnostics")]
    {
        crate::diag::init_logger();
    }
    #[cfg(not(feature = "diagnostics"))]
    {
        let _ = env_logger::try_init();
    }
}
