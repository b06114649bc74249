use crate::component::DiffuseMapComponent;
use crate::render::api::CullMode;
use crate::render::program::ShaderProgram;
use crate::render::shader::{RenderContext, Shader};

use super::{cull, drawable, load_transform};

/// Textured, unlit meshes whose fragments below `cutoff` alpha are
/// discarded. Drawn double-sided, for foliage and cut-out decals. Objects
/// without a [`DiffuseMapComponent`] are skipped.
pub struct AlphaTestShader {
    program: ShaderProgram,
    pub cutoff: f32,
}

impl AlphaTestShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("Alpha Test Shader")
                .with_attributes(&["vertPos", "vertNor", "vertTex"])
                .with_uniforms(&["P", "V", "M", "N", "diffuseMap", "alphaCutoff"]),
            cutoff: 0.1,
        }
    }
}

impl Default for AlphaTestShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for AlphaTestShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let program = &mut self.program;
        program.bind(ctx.cmd);
        ctx.cmd.cull(CullMode::None);
        ctx.load_camera(program);
        program.load_uniform(ctx.cmd, "alphaCutoff", self.cutoff);

        let frustum = ctx.camera_frustum();
        for go in ctx.attached::<Self>() {
            let Some(map) = ctx.world.get::<DiffuseMapComponent>(go).copied() else {
                continue;
            };
            let Some((mesh, spatial)) = drawable(ctx, go) else {
                continue;
            };
            if cull(ctx, frustum.as_ref(), go, &spatial) {
                continue;
            }
            load_transform(program, ctx, &spatial);
            program.reset_texture_units();
            program.load_texture(ctx.cmd, "diffuseMap", map.0);
            ctx.cmd.draw_mesh(mesh);
        }

        ctx.cmd.cull(CullMode::Back);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::component::{MeshComponent, Renderable, SpatialComponent};
    use crate::library::Library;
    use crate::render::shaders::test_support::{renderer, scene};
    use crate::render::{RenderCommand, RenderStats};

    #[test]
    fn draws_only_textured_objects_double_sided() {
        let (mut world, cam) = scene();
        let (quad, grid) = {
            let lib = world.resource::<Library>();
            (lib.get_mesh("quad").unwrap(), lib.get_texture("grid").unwrap())
        };
        world.spawn((
            MeshComponent(quad),
            SpatialComponent::at(Vec3::ZERO),
            DiffuseMapComponent(grid),
            Renderable::<AlphaTestShader>::new(),
        ));
        world.spawn((
            MeshComponent(quad),
            SpatialComponent::at(Vec3::ZERO),
            Renderable::<AlphaTestShader>::new(),
        ));

        let mut renderer = renderer(cam);
        renderer.add_scene_shader(AlphaTestShader::new());
        let commands = renderer.render(&mut world);

        let program_at = commands
            .iter()
            .position(|c| *c == RenderCommand::UseProgram("Alpha Test Shader".into()))
            .unwrap();
        assert_eq!(commands[program_at + 1], RenderCommand::Cull(CullMode::None));
        assert_eq!(commands.last(), Some(&RenderCommand::Cull(CullMode::Back)));
        assert_eq!(world.resource::<RenderStats>().total_draws(), 1);
    }
}
