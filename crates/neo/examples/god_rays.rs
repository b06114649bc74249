//! God rays.
//!
//! A bright sun sits behind a colonnade. Three pre-process passes build a
//! light-shaft mask and the post chain adds it over the lit scene:
//!
//! ```text
//! GodRaySunShader       sun billboard, white   ─┐
//! GodRayOccluderShader  occluders, black       ─┴► "godray"
//! GodRayBlurShader      radial blur toward the sun ──► "godrayblur"
//! PhongShader           scene ──► "default"
//! CombineShader         default + godrayblur ──► GammaCorrectShader
//! ```
//!
//! Occluders with an alpha map cut their mask the way the alpha test
//! shader cuts their color. Up and Down move the sun.

use neo::prelude::*;
use neo::render::{CullMode, FrameSize, FramebufferTarget};

const GODRAY_FBO: &str = "godray";
const GODRAY_BLUR_FBO: &str = "godrayblur";

/// The light drawn as the sun disk. Its spatial scale is the disk size.
#[derive(Debug, Clone, Copy, Default)]
struct SunComponent;

/// Blocks the sun in the god-ray mask.
#[derive(Debug, Clone, Copy, Default)]
struct SunOccluderComponent {
    alpha_map: Option<TextureHandle>,
}

/// A camera-facing quad at `position`, `size` across.
fn billboard(view: Mat4, position: Vec3, size: f32) -> Mat4 {
    let rotation = Mat3::from_mat4(view).transpose();
    Mat4::from_translation(position) * Mat4::from_mat3(rotation) * Mat4::from_scale(Vec3::splat(size))
}

/// `position` in the `[0, 1]` screen coordinates of `proj * view`.
fn screen_position(proj: Mat4, view: Mat4, position: Vec3) -> Vec2 {
    let clip = proj * view * position.extend(1.0);
    let ndc = clip.truncate() / clip.w.max(1e-4);
    Vec2::new(ndc.x, ndc.y) * 0.5 + Vec2::splat(0.5)
}

fn window_size(world: &World) -> UVec2 {
    world.resource::<FrameSize>().0.max(UVec2::ONE)
}

struct GodRaySunShader {
    program: ShaderProgram,
}

impl Shader for GodRaySunShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn init(&mut self, world: &mut World) {
        let size = window_size(world);
        world
            .resource_mut::<Library>()
            .get_fbo(GODRAY_FBO)
            .with_color(size)
            .with_depth(size)
            .follow_window();
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        ctx.cmd.bind_framebuffer(FramebufferTarget::named(GODRAY_FBO));
        ctx.cmd.viewport(ctx.frame_size);
        ctx.cmd.clear(Some(Vec4::new(0.0, 0.0, 0.0, 1.0)), true);
        ctx.cmd.depth_test(true);

        let (Some(camera), Some(quad)) = (ctx.camera_uniforms(), ctx.world.resource::<Library>().get_mesh("quad"))
        else {
            return;
        };
        let program = &mut self.program;
        program.bind(ctx.cmd);
        program.load_uniform(ctx.cmd, "P", camera.proj);
        program.load_uniform(ctx.cmd, "V", camera.view);

        for sun in ctx.world.collect::<SunComponent>() {
            let (Some(spatial), Some(light)) = (
                ctx.world.get::<SpatialComponent>(sun).copied(),
                ctx.world.get::<LightComponent>(sun).copied(),
            ) else {
                continue;
            };
            program.load_uniform(ctx.cmd, "M", billboard(camera.view, spatial.position, spatial.scale.x));
            program.load_uniform(ctx.cmd, "center", spatial.position);
            program.load_uniform(ctx.cmd, "sunColor", light.color);
            ctx.cmd.draw_mesh(quad);
        }
    }
}

struct GodRayOccluderShader {
    program: ShaderProgram,
}

impl Shader for GodRayOccluderShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let Some(camera) = ctx.camera_uniforms() else {
            return;
        };
        // Drawn over the sun pass without clearing.
        ctx.cmd.bind_framebuffer(FramebufferTarget::named(GODRAY_FBO));
        ctx.cmd.cull(CullMode::None);

        let program = &mut self.program;
        program.bind(ctx.cmd);
        program.load_uniform(ctx.cmd, "P", camera.proj);
        program.load_uniform(ctx.cmd, "V", camera.view);

        for go in ctx.world.collect::<SunOccluderComponent>() {
            let (Some(occluder), Some(mesh), Some(spatial)) = (
                ctx.world.get::<SunOccluderComponent>(go).copied(),
                ctx.world.get::<MeshComponent>(go).copied(),
                ctx.world.get::<SpatialComponent>(go).copied(),
            ) else {
                continue;
            };
            program.reset_texture_units();
            program.load_uniform(ctx.cmd, "M", spatial.model_matrix());
            program.load_uniform(ctx.cmd, "useTexture", occluder.alpha_map.is_some());
            if let Some(alpha_map) = occluder.alpha_map {
                program.load_texture(ctx.cmd, "alphaMap", alpha_map);
            }
            ctx.cmd.draw_mesh(mesh.0);
        }
        ctx.cmd.cull(CullMode::Back);
    }
}

/// Radial blur of the mask toward the sun's screen position.
struct GodRayBlurShader {
    program: ShaderProgram,
    exposure: f32,
    decay: f32,
    density: f32,
    weight: f32,
    samples: i32,
}

impl Shader for GodRayBlurShader {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn init(&mut self, world: &mut World) {
        let size = window_size(world);
        world
            .resource_mut::<Library>()
            .get_fbo(GODRAY_BLUR_FBO)
            .with_color(size)
            .follow_window();
    }

    fn render(&mut self, ctx: &mut RenderContext<'_>) {
        let library = ctx.world.resource::<Library>();
        let (Some(mask), Some(quad)) = (
            library.framebuffer(GODRAY_FBO).and_then(|fb| fb.color()),
            library.get_mesh("quad"),
        ) else {
            return;
        };
        let sun = ctx.world.collect::<SunComponent>().first().copied();
        let sun_position = sun.and_then(|go| ctx.world.get::<SpatialComponent>(go)).map(|s| s.position);
        let (Some(camera), Some(sun_position)) = (ctx.camera_uniforms(), sun_position) else {
            return;
        };

        ctx.cmd.bind_framebuffer(FramebufferTarget::named(GODRAY_BLUR_FBO));
        ctx.cmd.viewport(ctx.frame_size);
        ctx.cmd.clear(Some(Vec4::new(0.0, 0.0, 0.0, 1.0)), false);
        ctx.cmd.depth_test(false);

        let program = &mut self.program;
        program.bind(ctx.cmd);
        program.load_texture(ctx.cmd, "godrayMap", mask);
        program.load_uniform(ctx.cmd, "sunPos", screen_position(camera.proj, camera.view, sun_position));
        program.load_uniform(ctx.cmd, "exposure", self.exposure);
        program.load_uniform(ctx.cmd, "decay", self.decay);
        program.load_uniform(ctx.cmd, "density", self.density);
        program.load_uniform(ctx.cmd, "weight", self.weight);
        program.load_uniform(ctx.cmd, "numSamples", self.samples);
        ctx.cmd.draw_mesh(quad);

        ctx.cmd.depth_test(true);
    }
}

fn move_sun(world: &mut World, dt: f32) {
    let keys = world.resource::<Input<KeyCode>>();
    let dy = match (keys.pressed(KeyCode::ArrowUp), keys.pressed(KeyCode::ArrowDown)) {
        (true, false) => 4.0 * dt,
        (false, true) => -4.0 * dt,
        _ => return,
    };
    world.query_filtered::<&mut SpatialComponent, SunComponent>(|_, spatial| {
        spatial.move_by(Vec3::new(0.0, dy, 0.0));
    });
}

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig::named("GodRays"));

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 7.0));
    if let Some(spatial) = engine.world_mut().get_mut::<SpatialComponent>(camera) {
        spatial.set_position(Vec3::new(0.0, 0.6, 5.0));
    }

    engine.spawn((
        SpatialComponent::new(Vec3::new(0.0, 2.0, -20.0), Vec3::splat(12.0)),
        LightComponent::new(Vec3::ONE, Vec3::new(0.6, 0.2, 0.0)),
        SunComponent,
    ));

    let library = engine.world().resource::<Library>();
    let (Some(cube), Some(grid)) = (library.get_mesh("cube"), library.get_texture("grid")) else {
        log::error!("library is missing the cube mesh or grid texture");
        return Ok(());
    };

    // Two rows of columns between the camera and the sun.
    for row in [-3.0_f32, 3.0] {
        for i in 0..8 {
            engine.spawn((
                SpatialComponent::new(Vec3::new(row, 2.0, -2.0 - 2.5 * i as f32), Vec3::new(0.4, 4.0, 0.4)),
                MeshComponent(cube),
                MaterialComponent::new(0.2, Vec3::splat(0.8), Vec3::splat(0.3), 8.0),
                SunOccluderComponent::default(),
                Renderable::<PhongShader>::new(),
            ));
        }
    }
    // A lattice: occludes only where the grid texture is opaque.
    engine.spawn((
        SpatialComponent::new(Vec3::new(0.0, 4.5, -10.0), Vec3::new(6.0, 0.1, 18.0)),
        MeshComponent(cube),
        MaterialComponent::new(0.2, Vec3::splat(0.6), Vec3::ZERO, 1.0),
        DiffuseMapComponent(grid),
        SunOccluderComponent { alpha_map: Some(grid) },
        Renderable::<AlphaTestShader>::new(),
    ));
    engine.spawn((
        SpatialComponent::new(Vec3::new(0.0, -0.5, -10.0), Vec3::new(20.0, 0.5, 40.0)),
        MeshComponent(cube),
        MaterialComponent::new(0.2, Vec3::splat(0.5), Vec3::ZERO, 1.0),
        SunOccluderComponent::default(),
        Renderable::<PhongShader>::new(),
    ));

    engine.add_system(CameraControllerSystem::new());
    engine.add_system(move_sun);

    let renderer = engine.renderer_mut();
    renderer.add_preprocess_shader(GodRaySunShader {
        program: ShaderProgram::new("GodRaySun Shader")
            .with_attributes(&["vertPos", "vertTex"])
            .with_uniforms(&["P", "V", "M", "center", "sunColor"]),
    });
    renderer.add_preprocess_shader(GodRayOccluderShader {
        program: ShaderProgram::new("GodRayOccluder Shader")
            .with_attributes(&["vertPos", "vertTex"])
            .with_uniforms(&["P", "V", "M", "useTexture", "alphaMap"]),
    });
    renderer.add_preprocess_shader(GodRayBlurShader {
        program: ShaderProgram::new("GodRayBlur Shader")
            .with_uniforms(&["godrayMap", "sunPos", "exposure", "decay", "density", "weight", "numSamples"]),
        exposure: 0.3,
        decay: 0.97,
        density: 0.9,
        weight: 0.6,
        samples: 100,
    });
    renderer.add_scene_shader(PhongShader::new());
    renderer.add_scene_shader(AlphaTestShader::new());
    renderer.add_post_process_shader(
        PostProcessShader::new("CombineShader", "combine.frag")
            .with_uniform_names(&["godray"])
            .with_uniforms(|program, cmd, world| {
                let blurred = world
                    .resource::<Library>()
                    .framebuffer(GODRAY_BLUR_FBO)
                    .and_then(|fb| fb.color());
                if let Some(blurred) = blurred {
                    program.load_texture(cmd, "godray", blurred);
                }
            }),
    );
    renderer.add_post_process_shader(GammaCorrectShader::default());

    engine.run()
}
