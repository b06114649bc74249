use glam::Vec3;

use crate::render::api::{CullMode, PolygonMode};
use crate::render::program::ShaderProgram;
use crate::render::shader::{RenderContext, Shader};

use super::drawable;

/// Mesh edges in a flat color, drawn with culling off.
pub struct WireframeShader {
    program: ShaderProgram,
    pub color: Vec3,
}

impl WireframeShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("Wire Shader")
                .with_attributes(&["vertPos"])
                .with_uniforms(&["P", "V", "M", "wireColor"]),
            color: Vec3::ONE,
        }
    }
}

impl Default for WireframeShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for WireframeShader {
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
        ctx.cmd.polygon_mode(PolygonMode::Line);
        ctx.load_camera(program);
        program.load_uniform(ctx.cmd, "wireColor", self.color);

        for go in ctx.attached::<Self>() {
            let Some((mesh, spatial)) = drawable(ctx, go) else {
                log::trace!("wireframe: {go:?} has no mesh or spatial");
                continue;
            };
            program.load_uniform(ctx.cmd, "M", spatial.model_matrix());
            ctx.cmd.draw_mesh(mesh);
        }

        ctx.cmd.polygon_mode(PolygonMode::Fill);
        ctx.cmd.cull(CullMode::Back);
    }
}
