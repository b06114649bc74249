//! Shadow mapping in two passes.
//!
//! ```text
//! pre-process   ShadowCasterShader  light camera ──► "depthMap" (2048², depth only)
//! scene         PhongShadowShader   fragment ──L──► shadow map lookup
//! ```
//!
//! The light is the first object carrying a `LightComponent`, a
//! `CameraComponent` and a `SpatialComponent`. `L` maps world space to
//! shadow map texture space: `bias · P_light · V_light`, where `bias`
//! takes clip coordinates from `[-1, 1]` to `[0, 1]`.

use glam::{Mat4, UVec2, Vec3};

use crate::component::{CameraComponent, LightComponent, SpatialComponent};
use crate::ecs::{GameObject, World};
use crate::library::Library;
use crate::render::api::{CullMode, FramebufferTarget};
use crate::render::program::ShaderProgram;
use crate::render::shader::{CameraUniforms, RenderContext, Shader};

use super::{cull, drawable, load_diffuse_map, load_material, load_transform};

pub const SHADOW_MAP_FBO: &str = "depthMap";
pub const SHADOW_MAP_SIZE: u32 = 2048;

/// Clip space `[-1, 1]` to texture space `[0, 1]`.
pub fn shadow_bias() -> Mat4 {
    Mat4::from_translation(Vec3::splat(0.5)) * Mat4::from_scale(Vec3::splat(0.5))
}

fn light_camera(ctx: &RenderContext<'_>) -> Option<(GameObject, CameraUniforms)> {
    ctx.world
        .collect::<LightComponent>()
        .into_iter()
        .filter(|&go| ctx.world.has::<CameraComponent>(go))
        .find_map(|go| ctx.camera_uniforms_of(go).map(|u| (go, u)))
}

fn ensure_shadow_map(world: &mut World) {
    if !world.has_resource::<Library>() {
        world.insert_resource(Library::new());
    }
    let library = world.resource_mut::<Library>();
    if library.framebuffer(SHADOW_MAP_FBO).is_some_and(|fb| fb.depth.is_some()) {
        return;
    }
    library
        .get_fbo(SHADOW_MAP_FBO)
        .with_shadow_depth(UVec2::splat(SHADOW_MAP_SIZE));
}

/// Renders attached objects' depth from the light's camera into the
/// `"depthMap"` framebuffer. Front faces are culled to keep acne off lit
/// surfaces.
pub struct ShadowCasterShader {
    program: ShaderProgram,
    warned: bool,
}

impl ShadowCasterShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("Shadow Caster")
                .with_attributes(&["vertPos", "vertTex"])
                .with_uniforms(&["P", "V", "M", "useTexture", "diffuseMap"]),
            warned: false,
        }
    }
}

impl Default for ShadowCasterShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for ShadowCasterShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn init(&mut self, world: &mut World) {
        ensure_shadow_map(world);
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let Some((_, light)) = light_camera(ctx) else {
            if !self.warned {
                log::warn!("shadow caster: no light with a camera and spatial");
                self.warned = true;
            }
            return;
        };

        ctx.cmd.bind_framebuffer(FramebufferTarget::named(SHADOW_MAP_FBO));
        ctx.cmd.viewport(UVec2::splat(SHADOW_MAP_SIZE));
        ctx.cmd.clear(None, true);
        ctx.cmd.depth_test(true);
        ctx.cmd.cull(CullMode::Front);

        let program = &mut self.program;
        program.bind(ctx.cmd);
        program.load_uniform(ctx.cmd, "P", light.proj);
        program.load_uniform(ctx.cmd, "V", light.view);

        for go in ctx.attached::<Self>() {
            let Some((mesh, spatial)) = drawable(ctx, go) else {
                continue;
            };
            program.load_uniform(ctx.cmd, "M", spatial.model_matrix());
            load_diffuse_map(program, ctx, go);
            ctx.cmd.draw_mesh(mesh);
        }

        ctx.cmd.cull(CullMode::Back);
    }
}

/// Phong lighting that darkens fragments the shadow map says are occluded.
pub struct PhongShadowShader {
    program: ShaderProgram,
    /// Depth offset applied before comparing against the shadow map.
    pub bias: f32,
}

impl PhongShadowShader {
    pub fn new() -> Self {
        Self {
            program: ShaderProgram::new("Phong Shadow Shader")
                .with_attributes(&["vertPos", "vertNor", "vertTex"])
                .with_uniforms(&[
                    "P", "V", "M", "N", "L", "camPos", "lightPos", "lightCol", "lightAtt", "ambient",
                    "diffuseColor", "specularColor", "shine", "useTexture", "diffuseMap", "shadowMap",
                    "shadowBias",
                ]),
            bias: 0.005,
        }
    }
}

impl Default for PhongShadowShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for PhongShadowShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn init(&mut self, world: &mut World) {
        ensure_shadow_map(world);
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let shadow_map = ctx
            .world
            .resource::<Library>()
            .framebuffer(SHADOW_MAP_FBO)
            .and_then(|fb| fb.depth);
        let light = light_camera(ctx).map(|(_, l)| shadow_bias() * l.proj * l.view);

        let program = &mut self.program;
        program.bind(ctx.cmd);
        ctx.load_camera(program);
        ctx.load_light(program);
        program.load_uniform(ctx.cmd, "L", light.unwrap_or(Mat4::IDENTITY));
        program.load_uniform(ctx.cmd, "shadowBias", self.bias);

        let frustum = ctx.camera_frustum();
        for go in ctx.attached::<Self>() {
            let Some((mesh, spatial)) = drawable(ctx, go) else {
                continue;
            };
            if cull(ctx, frustum.as_ref(), go, &spatial) {
                continue;
            }
            load_transform(program, ctx, &spatial);
            load_diffuse_map(program, ctx, go);
            if let Some(depth) = shadow_map {
                program.load_texture(ctx.cmd, "shadowMap", depth);
            }
            load_material(program, ctx, go);
            ctx.cmd.draw_mesh(mesh);
        }
    }
}

/// Light position for shadow demos: a spatial looking at `target`.
pub fn light_looking_at(position: Vec3, target: Vec3) -> SpatialComponent {
    let mut spatial = SpatialComponent::at(position);
    spatial.set_look_dir(target - position);
    spatial
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::component::{MeshComponent, Renderable};
    use crate::render::shaders::test_support::{renderer, scene};
    use crate::render::{RenderCommand, RenderPhase, UniformValue};

    fn light(world: &mut World) -> GameObject {
        world.spawn((
            LightComponent::default(),
            light_looking_at(Vec3::new(0.0, 20.0, 20.0), Vec3::ZERO),
            CameraComponent::orthographic(Vec2::new(-30.0, 30.0), Vec2::new(-30.0, 30.0), 1.0, 80.0),
        ))
    }

    #[test]
    fn bias_maps_clip_to_texture_space() {
        let b = shadow_bias();
        assert_eq!(b.transform_point3(Vec3::splat(-1.0)), Vec3::ZERO);
        assert_eq!(b.transform_point3(Vec3::ONE), Vec3::ONE);
    }

    #[test]
    fn caster_renders_into_depth_map_before_the_scene() {
        let (mut world, cam) = scene();
        light(&mut world);
        let cube = world.resource::<Library>().get_mesh("cube").unwrap();
        world.spawn((
            MeshComponent(cube),
            SpatialComponent::at(Vec3::ZERO),
            Renderable::<ShadowCasterShader>::new(),
            Renderable::<PhongShadowShader>::new(),
        ));

        let mut renderer = renderer(cam);
        renderer.add_preprocess_shader(ShadowCasterShader::new());
        renderer.add_scene_shader(PhongShadowShader::new());
        let commands = renderer.render(&mut world);

        let fb = world.resource::<Library>().framebuffer(SHADOW_MAP_FBO).cloned().unwrap();
        assert_eq!(fb.size, UVec2::splat(2048));
        assert!(fb.depth.is_some() && fb.colors.is_empty());

        let depth_bind = commands
            .iter()
            .position(|c| *c == RenderCommand::BindFramebuffer(FramebufferTarget::named(SHADOW_MAP_FBO)))
            .unwrap();
        let scene_phase = commands
            .iter()
            .position(|c| *c == RenderCommand::Phase(RenderPhase::Scene))
            .unwrap();
        assert!(depth_bind < scene_phase);
        assert!(commands[depth_bind..scene_phase].contains(&RenderCommand::Cull(CullMode::Front)));
        assert!(commands[depth_bind..scene_phase].contains(&RenderCommand::DrawMesh(cube)));
        assert!(commands[scene_phase..].contains(&RenderCommand::BindTexture {
            unit: 0,
            texture: fb.depth.unwrap(),
        }));
    }

    #[test]
    fn receiver_loads_the_biased_light_matrix() {
        let (mut world, cam) = scene();
        let light = light(&mut world);
        let expected = {
            let camera = world.get::<CameraComponent>(light).unwrap();
            let spatial = world.get::<SpatialComponent>(light).unwrap();
            shadow_bias() * camera.proj_matrix() * camera.view_matrix(spatial)
        };

        let mut renderer = renderer(cam);
        renderer.add_scene_shader(PhongShadowShader::new());
        let commands = renderer.render(&mut world);
        let l = commands.iter().find_map(|c| match c {
            RenderCommand::SetUniform { name, value, .. } if name == "L" => Some(*value),
            _ => None,
        });
        assert_eq!(l, Some(UniformValue::Mat4(expected)));
    }

    #[test]
    fn caster_without_light_draws_nothing() {
        let (mut world, cam) = scene();
        let cube = world.resource::<Library>().get_mesh("cube").unwrap();
        world.spawn((
            MeshComponent(cube),
            SpatialComponent::at(Vec3::ZERO),
            Renderable::<ShadowCasterShader>::new(),
        ));
        let mut renderer = renderer(cam);
        renderer.add_preprocess_shader(ShadowCasterShader::new());
        let commands = renderer.render(&mut world);
        assert!(!commands.contains(&RenderCommand::DrawMesh(cube)));
    }
}
