use glam::Mat4;

use crate::component::{LineComponent, SpatialComponent};
use crate::render::program::ShaderProgram;
use crate::render::shader::{RenderContext, Shader};

/// Draws every [`LineComponent`] as a list of segments. Lines are not
/// attached through a marker: any object with a line is drawn.
pub struct LineShader {
    program: ShaderProgram,
}

impl LineShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("Line Shader")
                .with_attributes(&["vertPos"])
                .with_uniforms(&["P", "V", "M", "lineColor"]),
        }
    }
}

impl Default for LineShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for LineShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let program = &mut self.program;
        program.bind(ctx.cmd);
        ctx.load_camera(program);

        let mut lines = Vec::new();
        ctx.world.query::<(&LineComponent, Option<&SpatialComponent>)>(|_, (line, spatial)| {
            if line.nodes.len() < 2 {
                return;
            }
            let model = match spatial {
                Some(spatial) if !line.world_space => spatial.model_matrix(),
                _ => Mat4::IDENTITY,
            };
            lines.push((model, line.color, line.nodes.clone()));
        });

        for (model, color, nodes) in lines {
            program.load_uniform(ctx.cmd, "M", model);
            program.load_uniform(ctx.cmd, "lineColor", color);
            ctx.cmd.draw_lines(nodes);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::render::shaders::test_support::{renderer, scene};
    use crate::render::{RenderCommand, UniformValue};

    #[test]
    fn world_space_lines_ignore_the_spatial() {
        let (mut world, cam) = scene();
        world.spawn((
            LineComponent::world(Vec3::Y).with_segment(Vec3::ZERO, Vec3::X),
            SpatialComponent::at(Vec3::splat(3.0)),
        ));
        world.spawn_one(LineComponent::new(Vec3::X));

        let mut renderer = renderer(cam);
        renderer.add_scene_shader(LineShader::new());
        let commands = renderer.render(&mut world);

        let draws: Vec<_> = commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawLines(_)))
            .collect();
        assert_eq!(draws, vec![&RenderCommand::DrawLines(vec![Vec3::ZERO, Vec3::X])]);
        let model = commands.iter().rev().find_map(|c| match c {
            RenderCommand::SetUniform { name, value, .. } if name == "M" => Some(*value),
            _ => None,
        });
        assert_eq!(model, Some(UniformValue::Mat4(Mat4::IDENTITY)));
    }
}
