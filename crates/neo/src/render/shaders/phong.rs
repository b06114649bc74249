use crate::render::program::ShaderProgram;
use crate::render::shader::{RenderContext, Shader};

use super::{cull, drawable, load_diffuse_map, load_material, load_transform};

/// Blinn-Phong lighting from the first light, with view-frustum culling
/// against the render camera's [`FrustumComponent`](crate::component::FrustumComponent).
pub struct PhongShader {
    program: ShaderProgram,
}

impl PhongShader {
    pub const UNIFORMS: &'static [&'static str] = &[
        "P", "V", "M", "N", "camPos", "lightPos", "lightCol", "lightAtt", "ambient",
        "diffuseColor", "specularColor", "shine", "useTexture", "diffuseMap",
    ];

    pub fn new() -> Self {
        Self::with_program(
            ShaderProgram::new("Phong Shader")
                .with_attributes(&["vertPos", "vertNor", "vertTex"])
                .with_uniforms(Self::UNIFORMS),
        )
    }

    /// Uses a program built elsewhere, e.g. from GLSL files.
    pub fn with_program(program: ShaderProgram) -> Self {
        Self { program }
    }
}

impl Default for PhongShader {
    fn default() -> Self {
        Self::new()
    }
}

impl Shader for PhongShader {
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
        ctx.load_light(program);

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
            load_material(program, ctx, go);
            ctx.cmd.draw_mesh(mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::component::{
        BoundingBoxComponent, DiffuseMapComponent, LightComponent, MaterialComponent, MeshComponent,
        Renderable, SpatialComponent,
    };
    use crate::library::Library;
    use crate::render::shaders::test_support::{renderer, scene};
    use crate::render::{RenderCommand, RenderStats, UniformValue};

    #[test]
    fn draws_attached_objects_with_their_material() {
        let (mut world, cam) = scene();
        let cube = world.resource::<Library>().get_mesh("cube").unwrap();
        world.spawn((LightComponent::default(), SpatialComponent::at(Vec3::new(0.0, 2.0, 20.0))));
        world.spawn((
            MeshComponent(cube),
            SpatialComponent::at(Vec3::ZERO),
            MaterialComponent::diffuse(Vec3::new(1.0, 0.0, 1.0)),
            Renderable::<PhongShader>::new(),
        ));
        // Not attached.
        world.spawn((MeshComponent(cube), SpatialComponent::at(Vec3::ZERO)));

        let mut renderer = renderer(cam);
        renderer.add_scene_shader(PhongShader::new());
        let commands = renderer.render(&mut world);

        assert!(commands.contains(&RenderCommand::UseProgram("Phong Shader".into())));
        assert!(commands.contains(&RenderCommand::DrawMesh(cube)));
        let diffuse = commands.iter().rev().find_map(|c| match c {
            RenderCommand::SetUniform { name, value, .. } if name == "diffuseColor" => Some(*value),
            _ => None,
        });
        assert_eq!(diffuse, Some(UniformValue::Vec3(Vec3::new(1.0, 0.0, 1.0))));
        assert_eq!(world.resource::<RenderStats>().pass("Phong Shader").unwrap().draws, 1);
    }

    #[test]
    fn objects_outside_the_frustum_are_culled() {
        let (mut world, cam) = scene();
        let sphere = world.resource::<Library>().get_mesh("sphere").unwrap();
        let bounds = BoundingBoxComponent::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        for x in [0.0, 500.0] {
            world.spawn((
                MeshComponent(sphere),
                SpatialComponent::at(Vec3::new(x, 0.0, 0.0)),
                bounds,
                Renderable::<PhongShader>::new(),
            ));
        }
        // No bounding box: never culled.
        world.spawn((
            MeshComponent(sphere),
            SpatialComponent::at(Vec3::new(-500.0, 0.0, 0.0)),
            Renderable::<PhongShader>::new(),
        ));

        let mut renderer = renderer(cam);
        renderer.add_scene_shader(PhongShader::new());
        renderer.render(&mut world);

        let stats = world.resource::<RenderStats>().pass("Phong Shader").unwrap().clone();
        assert_eq!(stats.draws, 2);
        assert_eq!(stats.culled, 1);
    }

    #[test]
    fn diffuse_map_switches_use_texture() {
        let (mut world, cam) = scene();
        let (cube, grid) = {
            let lib = world.resource::<Library>();
            (lib.get_mesh("cube").unwrap(), lib.get_texture("grid").unwrap())
        };
        world.spawn((
            MeshComponent(cube),
            SpatialComponent::at(Vec3::ZERO),
            DiffuseMapComponent(grid),
            Renderable::<PhongShader>::new(),
        ));

        let mut renderer = renderer(cam);
        renderer.add_scene_shader(PhongShader::new());
        let commands = renderer.render(&mut world);
        assert!(commands.contains(&RenderCommand::BindTexture { unit: 0, texture: grid }));
        assert!(commands.contains(&RenderCommand::SetUniform {
            location: 12,
            name: "useTexture".into(),
            value: UniformValue::Bool(true),
        }));
    }
}
