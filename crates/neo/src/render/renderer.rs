//! # Renderer: Per-Frame Shader Dispatch
//!
//! The renderer owns three ordered shader lists and runs them after the
//! systems every frame:
//!
//! ```text
//!  pre-process shaders ──► their own targets (shadow maps ...)
//!          │
//!  scene target ◄── "default" framebuffer if any post-process shader is
//!          │        active, the backbuffer otherwise
//!          │        viewport = frame size, clear color + depth
//!  scene shaders
//!          │
//!  post-process chain
//!     default.color ─► [shader 1] ─► ping ─► [shader 2] ─► pong ─► ... ─► backbuffer
//!                        inputFBO = previous color, inputDepth = scene depth
//! ```
//!
//! Everything is recorded into a [`CommandBuffer`]; the engine hands the
//! finished list to the GPU backend, or a test reads it back.
//!
//! ## Attachment
//!
//! Adding a shader of type `S` registers the `Renderable<S>` hooks on the
//! next frame, which also picks up objects that already carry the marker.
//! From then on the [`ShaderAttachments`] resource tracks them.
//!
//! ## Resize
//!
//! On its first frame the renderer subscribes to [`WindowFrameSizeMessage`].
//! The receiver stores the new [`FrameSize`] and resizes every framebuffer
//! flagged to follow the window.

use std::any::{Any, TypeId};

use glam::{UVec2, Vec4};

use crate::component::{CameraComponent, ShaderAttachments, register_renderable};
use crate::ecs::{GameObject, World};
use crate::library::Library;
use crate::messaging::{Messenger, WindowFrameSizeMessage};

use super::api::{
    BlendMode, CommandBuffer, CullMode, DepthFunc, FramebufferTarget, PolygonMode, RenderCommand, RenderPhase,
};
use super::shader::{PostProcessInput, RenderContext, Shader};

/// Framebuffer the scene renders into while post-processing is active.
pub const SCENE_FBO: &str = "default";
pub const PING_FBO: &str = "ping";
pub const PONG_FBO: &str = "pong";

/// Current drawable size of the window, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize(pub UVec2);

impl Default for FrameSize {
    fn default() -> Self {
        Self(UVec2::new(1280, 720))
    }
}

/// What one shader did during the last frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PassStats {
    pub name: String,
    pub phase: RenderPhase,
    pub active: bool,
    pub draws: u32,
    pub culled: u32,
}

/// Per-shader statistics for the last rendered frame.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    pub passes: Vec<PassStats>,
    pub frames: u64,
}

impl RenderStats {
    pub fn total_draws(&self) -> u32 {
        self.passes.iter().map(|p| p.draws).sum()
    }

    pub fn total_culled(&self) -> u32 {
        self.passes.iter().map(|p| p.culled).sum()
    }

    pub fn pass(&self, name: &str) -> Option<&PassStats> {
        self.passes.iter().find(|p| p.name == name)
    }
}

/// Object-safe access to the concrete shader type.
trait ShaderAny: Shader {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: Shader> ShaderAny for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct ShaderSlot {
    shader: Box<dyn ShaderAny>,
    type_id: TypeId,
    active: bool,
    register: fn(&mut World),
    ready: bool,
}

impl ShaderSlot {
    fn new<S: Shader>(shader: S) -> Self {
        log::debug!("adding shader {}", shader.name());
        Self {
            shader: Box::new(shader),
            type_id: TypeId::of::<S>(),
            active: true,
            register: register_renderable::<S>,
            ready: false,
        }
    }

    fn prepare(&mut self, world: &mut World) {
        if !self.ready {
            (self.register)(world);
            self.shader.init(world);
            self.ready = true;
        }
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>, phase: RenderPhase) -> PassStats {
        let draws_before = ctx.cmd.draw_count();
        ctx.culled = 0;
        if self.active {
            self.shader.render(ctx);
        }
        PassStats {
            name: self.shader.name().to_string(),
            phase,
            active: self.active,
            draws: ctx.cmd.draw_count() - draws_before,
            culled: ctx.culled,
        }
    }
}

pub struct Renderer {
    default_camera: GameObject,
    clear_color: Vec4,
    preprocess: Vec<ShaderSlot>,
    scene: Vec<ShaderSlot>,
    post_process: Vec<ShaderSlot>,
    cmd: CommandBuffer,
    subscribed: bool,
}

impl Renderer {
    pub fn new(default_camera: GameObject, clear_color: Vec4) -> Self {
        Self {
            default_camera,
            clear_color,
            preprocess: Vec::new(),
            scene: Vec::new(),
            post_process: Vec::new(),
            cmd: CommandBuffer::new(),
            subscribed: false,
        }
    }

    pub fn default_camera(&self) -> GameObject {
        self.default_camera
    }

    pub fn set_default_camera(&mut self, camera: GameObject) {
        self.default_camera = camera;
    }

    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    // ── Shader lists ─────────────────────────────────────────────────

    pub fn add_preprocess_shader<S: Shader>(&mut self, shader: S) -> &mut S {
        Self::push(&mut self.preprocess, shader)
    }

    pub fn add_scene_shader<S: Shader>(&mut self, shader: S) -> &mut S {
        Self::push(&mut self.scene, shader)
    }

    pub fn add_post_process_shader<S: Shader>(&mut self, shader: S) -> &mut S {
        Self::push(&mut self.post_process, shader)
    }

    fn push<S: Shader>(list: &mut Vec<ShaderSlot>, shader: S) -> &mut S {
        list.push(ShaderSlot::new(shader));
        let slot = list.len() - 1;
        match list[slot].shader.as_any_mut().downcast_mut::<S>() {
            Some(shader) => shader,
            None => unreachable!("slot holds the shader just pushed"),
        }
    }

    fn slots(&self) -> impl Iterator<Item = &ShaderSlot> {
        self.preprocess
            .iter()
            .chain(&self.scene)
            .chain(&self.post_process)
    }

    fn slots_mut(&mut self) -> impl Iterator<Item = &mut ShaderSlot> {
        self.preprocess
            .iter_mut()
            .chain(&mut self.scene)
            .chain(&mut self.post_process)
    }

    /// The first shader of type `S` in any list.
    pub fn get<S: Shader>(&self) -> Option<&S> {
        self.slots()
            .find_map(|slot| slot.shader.as_any().downcast_ref::<S>())
    }

    pub fn get_mut<S: Shader>(&mut self) -> Option<&mut S> {
        self.slots_mut()
            .find_map(|slot| slot.shader.as_any_mut().downcast_mut::<S>())
    }

    /// Enables or disables every shader of type `S`. Returns `false` if
    /// there is none.
    pub fn set_active<S: Shader>(&mut self, active: bool) -> bool {
        let id = TypeId::of::<S>();
        let mut found = false;
        for slot in self.slots_mut().filter(|s| s.type_id == id) {
            slot.active = active;
            found = true;
        }
        found
    }

    /// Enables or disables the shader whose program is called `name`.
    pub fn set_active_by_name(&mut self, name: &str, active: bool) -> bool {
        match self.slots_mut().find(|s| s.shader.name() == name) {
            Some(slot) => {
                slot.active = active;
                true
            }
            None => false,
        }
    }

    pub fn is_active<S: Shader>(&self) -> Option<bool> {
        let id = TypeId::of::<S>();
        self.slots().find(|s| s.type_id == id).map(|s| s.active)
    }

    pub fn shader_names(&self) -> Vec<&str> {
        self.slots().map(|s| s.shader.name()).collect()
    }

    pub fn shader_count(&self) -> usize {
        self.preprocess.len() + self.scene.len() + self.post_process.len()
    }

    // ── Frame ────────────────────────────────────────────────────────

    /// Subscribes to window resizes and prepares newly added shaders.
    fn prepare(&mut self, world: &mut World) {
        if !world.has_resource::<ShaderAttachments>() {
            world.insert_resource(ShaderAttachments::new());
        }
        if !world.has_resource::<Library>() {
            world.insert_resource(Library::new());
        }
        if !world.has_resource::<FrameSize>() {
            world.insert_resource(FrameSize::default());
        }
        if !self.subscribed {
            if !world.has_resource::<Messenger>() {
                world.insert_resource(Messenger::new());
            }
            world
                .resource_mut::<Messenger>()
                .add_receiver::<WindowFrameSizeMessage>(on_frame_size);
            self.subscribed = true;
        }
        for slot in self.slots_mut() {
            slot.prepare(world);
        }
    }

    /// Records one frame and returns its commands. Per-shader statistics are
    /// stored in the [`RenderStats`] resource.
    pub fn render(&mut self, world: &mut World) -> Vec<RenderCommand> {
        self.prepare(world);

        let frame_size = world.resource::<FrameSize>().0.max(UVec2::ONE);
        if let Some(camera) = world.get_mut::<CameraComponent>(self.default_camera) {
            if camera.is_perspective() {
                camera.set_aspect(frame_size.x as f32 / frame_size.y as f32);
            }
        }

        let mut passes = Vec::with_capacity(self.shader_count());
        let mut cmd = std::mem::take(&mut self.cmd);
        {
            let mut ctx = RenderContext {
                world: &mut *world,
                cmd: &mut cmd,
                camera: self.default_camera,
                frame_size,
                input: None,
                culled: 0,
            };

            // Pre-process shaders bind their own targets.
            ctx.cmd.phase(RenderPhase::PreProcess);
            for slot in &mut self.preprocess {
                passes.push(slot.render(&mut ctx, RenderPhase::PreProcess));
            }

            let post_active = self.post_process.iter().any(|s| s.active);
            let scene_target = if post_active {
                ensure_window_fbo(ctx.world, SCENE_FBO, frame_size, true);
                FramebufferTarget::named(SCENE_FBO)
            } else {
                FramebufferTarget::Backbuffer
            };

            ctx.cmd.phase(RenderPhase::Scene);
            ctx.cmd.bind_framebuffer(scene_target);
            ctx.cmd.viewport(frame_size);
            ctx.cmd.depth_test(true);
            ctx.cmd.depth_func(DepthFunc::Less);
            ctx.cmd.blend(BlendMode::Off);
            ctx.cmd.cull(CullMode::Back);
            ctx.cmd.polygon_mode(PolygonMode::Fill);
            ctx.cmd.clear(Some(self.clear_color), true);
            for slot in &mut self.scene {
                passes.push(slot.render(&mut ctx, RenderPhase::Scene));
            }

            if post_active {
                ctx.cmd.phase(RenderPhase::PostProcess);
                Self::post_process(&mut self.post_process, &mut ctx, &mut passes);
            } else {
                for slot in &mut self.post_process {
                    passes.push(slot.render(&mut ctx, RenderPhase::PostProcess));
                }
            }
        }

        let stats = world.get_resource_mut::<RenderStats>();
        match stats {
            Some(stats) => {
                stats.passes = passes;
                stats.frames += 1;
            }
            None => world.insert_resource(RenderStats { passes, frames: 1 }),
        }

        let commands = cmd.take();
        self.cmd = cmd;
        commands
    }

    fn post_process(slots: &mut [ShaderSlot], ctx: &mut RenderContext<'_>, passes: &mut Vec<PassStats>) {
        let frame_size = ctx.frame_size;
        let (color, depth) = {
            let library = ctx.world.resource::<Library>();
            match library.framebuffer(SCENE_FBO) {
                Some(fb) => (fb.color(), fb.depth),
                None => (None, None),
            }
        };
        let Some(mut input_color) = color else {
            log::warn!("post-process skipped: `{SCENE_FBO}` framebuffer has no color attachment");
            return;
        };

        let last_active = slots.iter().rposition(|s| s.active);
        let mut use_ping = true;
        for (i, slot) in slots.iter_mut().enumerate() {
            if !slot.active {
                passes.push(slot.render(ctx, RenderPhase::PostProcess));
                continue;
            }

            let target_name = if use_ping { PING_FBO } else { PONG_FBO };
            let target = if Some(i) == last_active {
                FramebufferTarget::Backbuffer
            } else {
                ensure_window_fbo(ctx.world, target_name, frame_size, false);
                FramebufferTarget::named(target_name)
            };
            let is_backbuffer = target == FramebufferTarget::Backbuffer;

            ctx.cmd.bind_framebuffer(target);
            ctx.cmd.viewport(frame_size);
            ctx.cmd.depth_test(false);
            ctx.cmd.clear(Some(Vec4::new(0.0, 0.0, 0.0, 1.0)), false);
            ctx.input = Some(PostProcessInput {
                color: input_color,
                depth,
            });
            passes.push(slot.render(ctx, RenderPhase::PostProcess));
            ctx.input = None;

            if !is_backbuffer {
                let next = ctx
                    .world
                    .resource::<Library>()
                    .framebuffer(target_name)
                    .and_then(|fb| fb.color());
                if let Some(next) = next {
                    input_color = next;
                }
                use_ping = !use_ping;
            }
        }
        ctx.cmd.depth_test(true);
    }
}

/// Makes sure `name` exists with a color (and optionally depth) attachment
/// and follows the window.
fn ensure_window_fbo(world: &mut World, name: &str, size: UVec2, depth: bool) {
    let library = world.resource_mut::<Library>();
    let ready = library
        .framebuffer(name)
        .is_some_and(|fb| fb.color().is_some() && (!depth || fb.depth.is_some()));
    if ready {
        return;
    }
    let builder = library.get_fbo(name).with_color(size);
    let builder = if depth { builder.with_depth(size) } else { builder };
    builder.follow_window();
}

fn on_frame_size(world: &mut World, msg: &WindowFrameSizeMessage) {
    let size = msg.size.max(UVec2::ONE);
    world.insert_resource(FrameSize(size));
    if let Some(library) = world.get_resource_mut::<Library>() {
        library.resize_window_framebuffers(size);
    }
    log::debug!("frame size {}x{}", size.x, size.y);
}
