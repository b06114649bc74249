//! Deferred shading.
//!
//! ```text
//! pre-process   GBufferShader     geometry ──► "gbuffer" (position, normal, diffuse, specular, depth)
//! pre-process   LightPassShader   light volumes ──► "lightpass" (additive)
//! post-process  a combine pass    samples "lightpass.color"
//! ```
//!
//! Both framebuffers follow the window. A light's volume is the `"sphere"`
//! mesh scaled by its spatial's `scale.x`, drawn with front faces culled so
//! it still shades when the camera is inside it.

use glam::{Mat4, UVec2, Vec3};

use crate::component::{
    DiffuseMapComponent, LightComponent, MaterialComponent, NormalMapComponent, SpatialComponent,
    SpecularMapComponent,
};
use crate::ecs::{GameObject, World};
use crate::library::{Library, TextureFormat, TextureHandle};
use crate::render::api::{BlendMode, CullMode, FramebufferTarget};
use crate::render::program::ShaderProgram;
use crate::render::renderer::FrameSize;
use crate::render::shader::{RenderContext, Shader};

use super::drawable;

pub const GBUFFER_FBO: &str = "gbuffer";
pub const LIGHT_PASS_FBO: &str = "lightpass";

/// G-buffer color attachments in attachment order, with the sampler name
/// the light pass reads each one through.
pub const GBUFFER_ATTACHMENTS: [(&str, TextureFormat, &str); 4] = [
    ("position", TextureFormat::Rgba16Float, "gPosition"),
    ("normal", TextureFormat::Rgba16Float, "gNormal"),
    ("diffuse", TextureFormat::Rgba8, "gDiffuse"),
    ("specular", TextureFormat::Rgba8, "gSpecular"),
];

fn window_size(world: &World) -> UVec2 {
    world
        .get_resource::<FrameSize>()
        .map_or(UVec2::ONE, |size| size.0.max(UVec2::ONE))
}

fn ensure_library(world: &mut World) -> &mut Library {
    if !world.has_resource::<Library>() {
        world.insert_resource(Library::new());
    }
    world.resource_mut::<Library>()
}

fn ensure_gbuffer(world: &mut World) {
    let size = window_size(world);
    let library = ensure_library(world);
    let ready = library
        .framebuffer(GBUFFER_FBO)
        .is_some_and(|fb| fb.colors.len() == GBUFFER_ATTACHMENTS.len() && fb.depth.is_some());
    if ready {
        return;
    }
    let mut builder = library.get_fbo(GBUFFER_FBO);
    for (attachment, format, _) in GBUFFER_ATTACHMENTS {
        builder = builder.with_color_attachment(attachment, size, format);
    }
    builder.with_depth(size).follow_window();
}

/// Writes attached objects' surface attributes into the `"gbuffer"`
/// framebuffer, one attribute per color attachment.
///
/// Each map component switches its attribute from the material to a
/// texture: [`DiffuseMapComponent`] sets `useDiffuseMap`,
/// [`SpecularMapComponent`] sets `useSpecularMap` and
/// [`NormalMapComponent`] sets `useNormalMap`. Without a normal map the
/// object's normal matrix is loaded as `N`.
pub struct GBufferShader {
    program: ShaderProgram,
}

impl GBufferShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("GBufferShader")
                .with_attributes(&["vertPos", "vertNor", "vertTex"])
                .with_uniforms(&[
                    "P",
                    "V",
                    "M",
                    "N",
                    "useDiffuseMap",
                    "diffuseMap",
                    "diffuseMaterial",
                    "useSpecularMap",
                    "specularMap",
                    "specularMaterial",
                    "shine",
                    "useNormalMap",
                    "normalMap",
                ]),
        }
    }

    fn load_maps(program: &mut ShaderProgram, ctx: &mut RenderContext<'_>, go: GameObject, spatial: &SpatialComponent) {
        program.reset_texture_units();
        let material = ctx.world.get::<MaterialComponent>(go).copied();

        match ctx.world.get::<DiffuseMapComponent>(go).copied() {
            Some(map) => {
                program.load_uniform(ctx.cmd, "useDiffuseMap", true);
                program.load_texture(ctx.cmd, "diffuseMap", map.0);
            }
            None => {
                program.load_uniform(ctx.cmd, "useDiffuseMap", false);
                if let Some(material) = material {
                    program.load_uniform(ctx.cmd, "diffuseMaterial", material.diffuse);
                }
            }
        }

        match ctx.world.get::<SpecularMapComponent>(go).copied() {
            Some(map) => {
                program.load_uniform(ctx.cmd, "useSpecularMap", true);
                program.load_texture(ctx.cmd, "specularMap", map.0);
            }
            None => {
                program.load_uniform(ctx.cmd, "useSpecularMap", false);
                if let Some(material) = material {
                    program.load_uniform(ctx.cmd, "specularMaterial", material.specular);
                    program.load_uniform(ctx.cmd, "shine", material.shine);
                }
            }
        }

        match ctx.world.get::<NormalMapComponent>(go).copied() {
            Some(map) => {
                program.load_uniform(ctx.cmd, "useNormalMap", true);
                program.load_texture(ctx.cmd, "normalMap", map.0);
            }
            None => {
                program.load_uniform(ctx.cmd, "useNormalMap", false);
                program.load_uniform(ctx.cmd, "N", spatial.normal_matrix());
            }
        }
    }
}

impl Default for GBufferShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for GBufferShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn init(&mut self, world: &mut World) {
        ensure_gbuffer(world);
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let Some(camera) = ctx.camera_uniforms() else {
            log::warn!("gbuffer: render camera has no camera or spatial");
            return;
        };

        ctx.cmd.bind_framebuffer(FramebufferTarget::named(GBUFFER_FBO));
        ctx.cmd.viewport(ctx.frame_size);
        ctx.cmd.clear(Some(glam::Vec4::ZERO), true);
        ctx.cmd.depth_test(true);
        ctx.cmd.cull(CullMode::Back);

        let program = &mut self.program;
        program.bind(ctx.cmd);
        program.load_uniform(ctx.cmd, "P", camera.proj);
        program.load_uniform(ctx.cmd, "V", camera.view);

        for go in ctx.attached::<Self>() {
            let Some((mesh, spatial)) = drawable(ctx, go) else {
                continue;
            };
            program.load_uniform(ctx.cmd, "M", spatial.model_matrix());
            Self::load_maps(program, ctx, go, &spatial);
            ctx.cmd.draw_mesh(mesh);
        }
    }
}

/// Accumulates attached lights into `"lightpass"`, shading each light's
/// volume from the G-buffer.
pub struct LightPassShader {
    program: ShaderProgram,
    warned: bool,
}

impl LightPassShader {
    pub fn new() -> Self {
        let samplers = GBUFFER_ATTACHMENTS.map(|(_, _, sampler)| sampler);
        Self {
            program: ShaderProgram::new("LightPassShader")
                .with_attributes(&["vertPos"])
                .with_uniforms(&["P", "V", "M", "camPos", "lightPos", "lightCol", "lightRadius", "invScreenSize"])
                .with_uniforms(&samplers),
            warned: false,
        }
    }
}

impl Default for LightPassShader {
    fn default() -> Self {
        Self::new()
    }
}

/// Model matrix of a light volume: centered on the light, radius `radius`.
pub fn light_volume(position: Vec3, radius: f32) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(radius))
}

impl Shader for LightPassShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn init(&mut self, world: &mut World) {
        ensure_gbuffer(world);
        let size = window_size(world);
        let library = ensure_library(world);
        if library.framebuffer(LIGHT_PASS_FBO).is_none_or(|fb| fb.color().is_none()) {
            library.get_fbo(LIGHT_PASS_FBO).with_color(size).follow_window();
        }
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let (gbuffer, sphere): (Vec<TextureHandle>, _) = {
            let library = ctx.world.resource::<Library>();
            let gbuffer = library.framebuffer(GBUFFER_FBO).map(|fb| fb.colors.clone()).unwrap_or_default();
            (gbuffer, library.get_mesh("sphere"))
        };
        let Some(sphere) = sphere.filter(|_| gbuffer.len() == GBUFFER_ATTACHMENTS.len()) else {
            if !self.warned {
                log::warn!("light pass: `{GBUFFER_FBO}` is incomplete or the sphere mesh is missing");
                self.warned = true;
            }
            return;
        };

        ctx.cmd.bind_framebuffer(FramebufferTarget::named(LIGHT_PASS_FBO));
        ctx.cmd.viewport(ctx.frame_size);
        ctx.cmd.clear(Some(glam::Vec4::new(0.0, 0.0, 0.0, 1.0)), false);
        ctx.cmd.depth_test(false);
        ctx.cmd.blend(BlendMode::Additive);
        ctx.cmd.cull(CullMode::Front);

        let program = &mut self.program;
        program.bind(ctx.cmd);
        ctx.load_camera(program);
        program.load_uniform(ctx.cmd, "invScreenSize", glam::Vec2::ONE / ctx.frame_size.as_vec2());
        for ((_, _, sampler), texture) in GBUFFER_ATTACHMENTS.iter().zip(gbuffer) {
            program.load_texture(ctx.cmd, sampler, texture);
        }

        for go in ctx.attached::<Self>() {
            let (Some(light), Some(spatial)) = (
                ctx.world.get::<LightComponent>(go).copied(),
                ctx.world.get::<SpatialComponent>(go).copied(),
            ) else {
                continue;
            };
            let radius = spatial.scale.x;
            program.load_uniform(ctx.cmd, "M", light_volume(spatial.position, radius));
            program.load_uniform(ctx.cmd, "lightPos", spatial.position);
            program.load_uniform(ctx.cmd, "lightCol", light.color);
            program.load_uniform(ctx.cmd, "lightRadius", radius);
            ctx.cmd.draw_mesh(sphere);
        }

        ctx.cmd.blend(BlendMode::Off);
        ctx.cmd.cull(CullMode::Back);
        ctx.cmd.depth_test(true);
    }
}
