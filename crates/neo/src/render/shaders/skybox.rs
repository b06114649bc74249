//! Skybox and environment-mapped surfaces.
//!
//! All three read the cube map of the single [`SkyboxComponent`] object.
//! The skybox is drawn as the `"cube"` mesh around the camera with
//! `LessEqual` depth so it lands on the far plane behind everything else.

use crate::component::{ReflectionComponent, RefractionComponent, SkyboxComponent, skybox_cube_map};
use crate::library::{Library, TextureHandle};
use crate::render::api::{CullMode, DepthFunc};
use crate::render::program::ShaderProgram;
use crate::render::shader::{RenderContext, Shader};

use super::{cull, drawable, load_transform};

pub struct SkyboxShader {
    program: ShaderProgram,
}

impl SkyboxShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("Skybox Shader")
                .with_attributes(&["vertPos"])
                .with_uniforms(&["P", "V", "cubeMap"]),
        }
    }
}

impl Default for SkyboxShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for SkyboxShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let Some((_, cube_map)) = skybox_cube_map(ctx.world) else {
            return;
        };
        let Some(cube) = ctx.world.resource::<Library>().get_mesh("cube") else {
            return;
        };
        let Some(camera) = ctx.camera_uniforms() else {
            return;
        };

        ctx.cmd.cull(CullMode::None);
        ctx.cmd.depth_func(DepthFunc::LessEqual);

        let program = &mut self.program;
        program.bind(ctx.cmd);
        program.load_uniform(ctx.cmd, "P", camera.proj);
        program.load_uniform(ctx.cmd, "V", camera.view);
        program.load_texture(ctx.cmd, "cubeMap", cube_map);
        ctx.cmd.draw_mesh(cube);

        ctx.cmd.cull(CullMode::Back);
        ctx.cmd.depth_func(DepthFunc::Less);
    }
}

/// Binds `program`, loads the camera and the sky's cube map.
fn begin_environment(program: &mut ShaderProgram, ctx: &mut RenderContext<'_>) -> Option<TextureHandle> {
    program.bind(ctx.cmd);
    if !ctx.load_camera(program) {
        return None;
    }
    let cube_map = skybox_cube_map(ctx.world).map(|(_, map)| map);
    match cube_map {
        Some(map) => {
            program.load_texture(ctx.cmd, "cubeMap", map);
        }
        None => log::debug!("{}: no skybox cube map", program.name()),
    }
    cube_map
}

const ENVIRONMENT_UNIFORMS: &[&str] = &["P", "V", "M", "N", "camPos", "cubeMap"];

/// Draws every object with a [`ReflectionComponent`] as a mirror of the
/// skybox.
pub struct ReflectionShader {
    program: ShaderProgram,
}

impl ReflectionShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("Reflection Shader")
                .with_attributes(&["vertPos", "vertNor"])
                .with_uniforms(ENVIRONMENT_UNIFORMS),
        }
    }
}

impl Default for ReflectionShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for ReflectionShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let program = &mut self.program;
        if begin_environment(program, ctx).is_none() {
            return;
        }
        let frustum = ctx.camera_frustum();
        for go in ctx.world.collect::<ReflectionComponent>() {
            let Some((mesh, spatial)) = drawable(ctx, go) else {
                continue;
            };
            if cull(ctx, frustum.as_ref(), go, &spatial) {
                continue;
            }
            load_transform(program, ctx, &spatial);
            ctx.cmd.draw_mesh(mesh);
        }
    }
}

/// Draws every object with a [`RefractionComponent`], bending the skybox
/// by the component's `ratio`.
pub struct RefractionShader {
    program: ShaderProgram,
}

impl RefractionShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("Refraction Shader")
                .with_attributes(&["vertPos", "vertNor"])
                .with_uniforms(ENVIRONMENT_UNIFORMS)
                .with_uniforms(&["ratio"]),
        }
    }
}

impl Default for RefractionShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for RefractionShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let program = &mut self.program;
        if begin_environment(program, ctx).is_none() {
            return;
        }
        let frustum = ctx.camera_frustum();
        for go in ctx.world.collect::<RefractionComponent>() {
            let Some((mesh, spatial)) = drawable(ctx, go) else {
                continue;
            };
            if cull(ctx, frustum.as_ref(), go, &spatial) {
                continue;
            }
            let Some(refraction) = ctx.world.get::<RefractionComponent>(go).copied() else {
                continue;
            };
            load_transform(program, ctx, &spatial);
            program.load_uniform(ctx.cmd, "ratio", refraction.ratio);
            ctx.cmd.draw_mesh(mesh);
        }
    }
}
