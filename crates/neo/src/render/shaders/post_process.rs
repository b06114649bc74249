use std::path::Path;

use glam::{UVec2, Vec2};

use crate::ecs::World;
use crate::error::NeoError;
use crate::library::{Library, MeshHandle};
use crate::render::api::CommandBuffer;
use crate::render::program::{ShaderProgram, StageKind};
use crate::render::shader::{RenderContext, Shader};

/// Extra uniforms for a post-process pass, loaded after the inputs.
pub type UniformCallback = Box<dyn FnMut(&mut ShaderProgram, &mut CommandBuffer, &World)>;

const INPUTS: &[&str] = &["inputFBO", "inputDepth"];

/// Binds `program` and its inputs. Returns the fullscreen quad to draw, or
/// `None` outside the post-process chain.
fn begin_fullscreen(program: &mut ShaderProgram, ctx: &mut RenderContext<'_>) -> Option<MeshHandle> {
    let Some(input) = ctx.input else {
        log::warn!("{} rendered outside the post-process chain", program.name());
        return None;
    };
    let quad = ctx.world.resource::<Library>().get_mesh("quad")?;
    program.bind(ctx.cmd);
    program.load_texture(ctx.cmd, "inputFBO", input.color);
    if let Some(depth) = input.depth {
        program.load_texture(ctx.cmd, "inputDepth", depth);
    }
    Some(quad)
}

/// A fullscreen pass: the named fragment stage reads the previous stage's
/// color as `inputFBO` and the scene depth as `inputDepth`.
pub struct PostProcessShader {
    program: ShaderProgram,
    fragment: String,
    uniforms: Option<UniformCallback>,
}

impl PostProcessShader {
    /// A pass whose fragment stage lives in `fragment` (a file name the
    /// backend resolves). Only the input uniforms are declared.
    pub fn new(name: &str, fragment: &str) -> Self {
        Self {
            program: ShaderProgram::new(name).with_uniforms(INPUTS),
            fragment: fragment.to_string(),
            uniforms: None,
        }
    }

    /// Reads `dir/fragment` and declares the uniforms it contains.
    pub fn from_file(name: &str, dir: impl AsRef<Path>, fragment: &str) -> Result<Self, NeoError> {
        let program = ShaderProgram::new(name)
            .with_uniforms(INPUTS)
            .with_stage_file(StageKind::Fragment, dir.as_ref().join(fragment))?;
        Ok(Self {
            program,
            fragment: fragment.to_string(),
            uniforms: None,
        })
    }

    /// Declares extra uniforms by name.
    pub fn with_uniform_names(mut self, names: &[&str]) -> Self {
        self.program = self.program.with_uniforms(names);
        self
    }

    /// Loads extra uniforms every frame.
    pub fn with_uniforms(
        mut self,
        f: impl FnMut(&mut ShaderProgram, &mut CommandBuffer, &World) + 'static,
    ) -> Self {
        self.uniforms = Some(Box::new(f));
        self
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

impl Shader for PostProcessShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let Some(quad) = begin_fullscreen(&mut self.program, ctx) else {
            return;
        };
        if let Some(uniforms) = self.uniforms.as_mut() {
            uniforms(&mut self.program, ctx.cmd, ctx.world);
        }
        ctx.cmd.draw_mesh(quad);
    }
}

/// Maps linear color to display gamma as the last post-process step.
pub struct GammaCorrectShader {
    program: ShaderProgram,
    pub gamma: f32,
}

impl GammaCorrectShader {
    pub fn new(gamma: f32) -> Self {
        Self {
            program: ShaderProgram::new("Gamma Correct")
                .with_uniforms(INPUTS)
                .with_uniforms(&["gamma"]),
            gamma,
        }
    }
}

impl Default for GammaCorrectShader {
    fn default() -> Self {
        Self::new(2.2)
    }
}

impl Shader for GammaCorrectShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let Some(quad) = begin_fullscreen(&mut self.program, ctx) else {
            return;
        };
        self.program.load_uniform(ctx.cmd, "gamma", self.gamma);
        ctx.cmd.draw_mesh(quad);
    }
}

/// Depth of field: blurs the previous color by how far each fragment's
/// depth is from the focus ranges.
///
/// `dof_world` and `dof_weapon` are `(scale, bias)` pairs turning depth
/// into blur amount for the scene and for near-camera geometry. The
/// filter steps a quarter texel per row, so the offsets follow the frame
/// size.
pub struct DepthOfFieldShader {
    program: ShaderProgram,
    pub dof_world: Vec2,
    pub dof_weapon: Vec2,
}

impl DepthOfFieldShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("DOF Shader")
                .with_uniforms(INPUTS)
                .with_uniforms(&["invRenderTargetSize", "dofEqWorld", "dofEqWeapon", "dofRowDelta"]),
            dof_world: Vec2::ZERO,
            dof_weapon: Vec2::ZERO,
        }
    }

    pub fn with_focus(mut self, world: Vec2, weapon: Vec2) -> Self {
        self.dof_world = world;
        self.dof_weapon = weapon;
        self
    }
}

impl Default for DepthOfFieldShader {
    fn default() -> Self {
        Self::new()
    }
}

/// Texel size of a `size` target.
pub fn inv_render_target_size(size: UVec2) -> Vec2 {
    Vec2::ONE / size.max(UVec2::ONE).as_vec2()
}

/// Vertical step between filter rows.
pub fn dof_row_delta(size: UVec2) -> Vec2 {
    Vec2::new(0.0, 0.25 / size.y.max(1) as f32)
}

impl Shader for DepthOfFieldShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let Some(quad) = begin_fullscreen(&mut self.program, ctx) else {
            return;
        };
        let size = ctx.frame_size;
        let program = &mut self.program;
        program.load_uniform(ctx.cmd, "invRenderTargetSize", inv_render_target_size(size));
        program.load_uniform(ctx.cmd, "dofEqWorld", self.dof_world);
        program.load_uniform(ctx.cmd, "dofEqWeapon", self.dof_weapon);
        program.load_uniform(ctx.cmd, "dofRowDelta", dof_row_delta(size));
        ctx.cmd.draw_mesh(quad);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shaders::test_support::{renderer, scene};
    use crate::render::{FramebufferTarget, RenderCommand, RenderStats, UniformValue};
    use crate::time::Time;

    #[test]
    fn callback_uniforms_follow_the_inputs() {
        let (mut world, cam) = scene();
        world.insert_resource(Time::new());
        let mut renderer = renderer(cam);
        renderer.add_post_process_shader(
            PostProcessShader::new("BlueShader", "blue.frag")
                .with_uniform_names(&["time"])
                .with_uniforms(|program, cmd, world| {
                    program.load_uniform(cmd, "time", world.resource::<Time>().elapsed_secs());
                }),
        );

        let commands = renderer.render(&mut world);
        assert_eq!(commands.last(), Some(&RenderCommand::DepthTest(true)));
        let time = commands.iter().position(|c| matches!(c, RenderCommand::SetUniform { name, .. } if name == "time"));
        let input = commands.iter().position(|c| matches!(c, RenderCommand::SetUniform { name, .. } if name == "inputFBO"));
        assert!(input < time);
        assert_eq!(world.resource::<RenderStats>().pass("BlueShader").unwrap().draws, 1);
        assert_eq!(
            renderer.get::<PostProcessShader>().map(PostProcessShader::fragment),
            Some("blue.frag")
        );
    }

    #[test]
    fn gamma_is_last_and_reaches_the_backbuffer() {
        let (mut world, cam) = scene();
        let mut renderer = renderer(cam);
        renderer.add_post_process_shader(PostProcessShader::new("InvertShader", "invert.frag"));
        renderer.add_post_process_shader(GammaCorrectShader::default());
        let commands = renderer.render(&mut world);

        let backbuffer = commands
            .iter()
            .rposition(|c| *c == RenderCommand::BindFramebuffer(FramebufferTarget::Backbuffer))
            .unwrap();
        assert!(commands[backbuffer..].contains(&RenderCommand::UseProgram("Gamma Correct".into())));
        assert_eq!(commands_uniform(&commands, "gamma"), Some(UniformValue::Float(2.2)));
    }

    #[test]
    fn outside_the_chain_nothing_is_drawn() {
        let (mut world, cam) = scene();
        let mut renderer = renderer(cam);
        renderer.add_scene_shader(PostProcessShader::new("Misplaced", "x.frag"));
        renderer.render(&mut world);
        assert_eq!(world.resource::<RenderStats>().total_draws(), 0);
    }

    #[test]
    fn from_file_reflects_extra_uniforms() {
        let dir = std::env::temp_dir().join(format!("neo-post-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("blur.frag"),
            "uniform sampler2D inputFBO;\nuniform float radius;\nout vec4 color;\n",
        )
        .unwrap();
        let shader = PostProcessShader::from_file("Blur", &dir, "blur.frag").unwrap();
        assert!(shader.program().has_uniform("radius"));
        assert_eq!(shader.program().uniform_location("inputFBO"), Some(0));
        std::fs::remove_dir_all(&dir).ok();

        assert!(PostProcessShader::from_file("Blur", &dir, "blur.frag").is_err());
    }

    #[test]
    fn depth_of_field_follows_the_frame_size() {
        let (mut world, cam) = scene();
        let mut renderer = renderer(cam);
        renderer.add_post_process_shader(
            DepthOfFieldShader::new().with_focus(Vec2::new(0.5, 0.1), Vec2::new(2.0, 0.0)),
        );
        let commands = renderer.render(&mut world);

        assert_eq!(
            commands_uniform(&commands, "invRenderTargetSize"),
            Some(UniformValue::Vec2(Vec2::new(1.0 / 800.0, 1.0 / 600.0)))
        );
        assert_eq!(
            commands_uniform(&commands, "dofRowDelta"),
            Some(UniformValue::Vec2(Vec2::new(0.0, 0.25 / 600.0)))
        );
        assert_eq!(commands_uniform(&commands, "dofEqWorld"), Some(UniformValue::Vec2(Vec2::new(0.5, 0.1))));
        // The scene depth reaches the pass.
        assert!(commands_uniform(&commands, "inputDepth").is_some());

        world.insert_resource(crate::render::FrameSize(UVec2::new(1920, 1080)));
        let commands = renderer.render(&mut world);
        assert_eq!(
            commands_uniform(&commands, "dofRowDelta"),
            Some(UniformValue::Vec2(Vec2::new(0.0, 0.25 / 1080.0)))
        );
    }

    fn commands_uniform(commands: &[RenderCommand], name: &str) -> Option<UniformValue> {
        commands.iter().rev().find_map(|c| match c {
            RenderCommand::SetUniform { name: n, value, .. } if n == name => Some(*value),
            _ => None,
        })
    }
}
