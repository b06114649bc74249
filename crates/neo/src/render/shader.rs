//! # Shaders
//!
//! A shader is one rendering technique: it owns a [`ShaderProgram`] and,
//! once per frame, walks the objects attached to it and records draw calls.
//!
//! ```text
//! Renderer ──► shader.render(ctx)
//!                 │
//!                 ├─ program.bind(cmd)
//!                 ├─ per-frame uniforms (P, V, camPos, light ...)
//!                 └─ for go in ctx.attached::<Self>()
//!                       per-object uniforms (M, N, material ...)
//!                       cmd.draw_mesh(mesh)
//! ```
//!
//! Objects opt in with a [`Renderable<S>`](crate::component::Renderable)
//! marker, so the shader never scans components it does not draw.

use glam::{Mat4, UVec2, Vec3};

use crate::component::{
    CameraComponent, FrustumComponent, LightComponent, ShaderAttachments, SpatialComponent,
};
use crate::ecs::{GameObject, World};
use crate::library::TextureHandle;

use super::api::CommandBuffer;
use super::program::ShaderProgram;

/// A rendering technique driven by the [`Renderer`](super::Renderer).
pub trait Shader: 'static {
    fn program(&self) -> &ShaderProgram;

    fn program_mut(&mut self) -> &mut ShaderProgram;

    /// Called once, before the first frame the shader renders. Shaders that
    /// need their own framebuffers create them here.
    fn init(&mut self, _world: &mut World) {}

    fn render(&mut self, ctx: &mut RenderContext<'_>);

    fn name(&self) -> &str {
        self.program().name()
    }
}

/// Textures handed to a post-process shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessInput {
    /// Color output of the previous stage.
    pub color: TextureHandle,
    /// Depth of the scene pass.
    pub depth: Option<TextureHandle>,
}

/// Camera state a shader loads as `P`, `V` and `camPos`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraUniforms {
    pub proj: Mat4,
    pub view: Mat4,
    pub position: Vec3,
}

/// Everything a shader sees while rendering.
pub struct RenderContext<'a> {
    pub world: &'a mut World,
    pub cmd: &'a mut CommandBuffer,
    /// The camera the frame is rendered from.
    pub camera: GameObject,
    pub frame_size: UVec2,
    /// Set for post-process shaders only.
    pub input: Option<PostProcessInput>,
    /// Objects skipped by view-frustum culling during this pass.
    pub culled: u32,
}

impl RenderContext<'_> {
    /// Objects attached to shader type `S`, in attachment order.
    pub fn attached<S: 'static>(&self) -> Vec<GameObject> {
        self.world
            .get_resource::<ShaderAttachments>()
            .map(|att| att.attached::<S>().to_vec())
            .unwrap_or_default()
    }

    /// Projection, view and position of `camera`, if it has a camera and a
    /// spatial.
    pub fn camera_uniforms_of(&self, camera: GameObject) -> Option<CameraUniforms> {
        let cam = self.world.get::<CameraComponent>(camera)?;
        let spatial = self.world.get::<SpatialComponent>(camera)?;
        Some(CameraUniforms {
            proj: cam.proj_matrix(),
            view: cam.view_matrix(spatial),
            position: spatial.position,
        })
    }

    pub fn camera_uniforms(&self) -> Option<CameraUniforms> {
        self.camera_uniforms_of(self.camera)
    }

    /// Frustum planes of the render camera, when it tracks them.
    pub fn camera_frustum(&self) -> Option<FrustumComponent> {
        self.world.get::<FrustumComponent>(self.camera).copied()
    }

    /// The first light with a position, with that position.
    pub fn first_light(&self) -> Option<(GameObject, LightComponent, Vec3)> {
        let light = self.world.collect::<LightComponent>().into_iter().find(|&go| {
            self.world.has::<SpatialComponent>(go)
        })?;
        let component = *self.world.get::<LightComponent>(light)?;
        let position = self.world.get::<SpatialComponent>(light)?.position;
        Some((light, component, position))
    }

    /// Loads `P`, `V` and `camPos` for the render camera. Returns `false`
    /// when the camera is missing its components.
    pub fn load_camera(&mut self, program: &mut ShaderProgram) -> bool {
        let Some(camera) = self.camera_uniforms() else {
            log::warn!("render camera {:?} has no camera or spatial", self.camera);
            return false;
        };
        program.load_uniform(self.cmd, "P", camera.proj);
        program.load_uniform(self.cmd, "V", camera.view);
        program.load_uniform(self.cmd, "camPos", camera.position);
        true
    }

    /// Loads `lightPos`, `lightCol` and `lightAtt` from the first light.
    pub fn load_light(&mut self, program: &mut ShaderProgram) -> bool {
        let Some((_, light, position)) = self.first_light() else {
            return false;
        };
        program.load_uniform(self.cmd, "lightPos", position);
        program.load_uniform(self.cmd, "lightCol", light.color);
        program.load_uniform(self.cmd, "lightAtt", light.attenuation);
        true
    }
}
