//! Deferred shading.
//!
//! A field of cubes and spheres is written once into the `"gbuffer"`
//! framebuffer. Fifty small colored lights then circle over it; each is
//! shaded only inside its light volume and summed into `"lightpass"`. A
//! combine pass adds the ambient term from the G-buffer's diffuse target.
//!
//! ```text
//! GBufferShader ─► LightPassShader ─► CombineShader ─► GammaCorrectShader
//! ```
//!
//! The wgpu backend presents only the scene pass, so on screen this shows
//! the chain's final target as the backend sees it; the passes themselves
//! are visible in the per-shader statistics.

use neo::prelude::*;
use neo::render::shaders::{GBUFFER_FBO, LIGHT_PASS_FBO};
use rand::Rng;

const LIGHTS: usize = 50;
const FIELD: f32 = 30.0;

/// A light circling `center` at `speed` radians per second.
struct Orbit {
    center: Vec3,
    radius: f32,
    speed: f32,
    angle: f32,
}

fn orbit_lights(world: &mut World, dt: f32) {
    world.query::<(&mut SpatialComponent, &mut Orbit)>(|_, (spatial, orbit)| {
        orbit.angle += orbit.speed * dt;
        let offset = Vec3::new(orbit.angle.cos(), 0.0, orbit.angle.sin()) * orbit.radius;
        spatial.set_position(orbit.center + offset);
    });
}

fn main() -> Result<(), NeoError> {
    init_logging();
    let mut engine = Engine::new(EngineConfig::named("Deferred"));

    let camera = engine.renderer().default_camera();
    engine.add_component(camera, CameraControllerComponent::new(0.4, 10.0));
    if let Some(spatial) = engine.world_mut().get_mut::<SpatialComponent>(camera) {
        spatial.set_position(Vec3::new(0.0, 12.0, 40.0));
        spatial.set_look_dir(Vec3::new(0.0, -0.4, -1.0));
    }

    let library = engine.world().resource::<Library>();
    let (Some(cube), Some(sphere)) = (library.get_mesh("cube"), library.get_mesh("sphere")) else {
        log::error!("library is missing the cube or sphere mesh");
        return Ok(());
    };
    let grid = library.get_texture("grid");

    let mut rng = rand::thread_rng();
    for i in 0..200 {
        let position = Vec3::new(rng.gen_range(-FIELD..FIELD), 0.5, rng.gen_range(-FIELD..FIELD));
        let diffuse = Vec3::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
        let object = engine.spawn((
            SpatialComponent::new(position, Vec3::splat(rng.gen_range(0.5..1.5))),
            MeshComponent(if i % 2 == 0 { cube } else { sphere }),
            MaterialComponent::new(0.2, diffuse, Vec3::ONE, 16.0),
            Renderable::<GBufferShader>::new(),
        ));
        // Every fifth object reads its diffuse color from a texture.
        if let Some(grid) = grid.filter(|_| i % 5 == 0) {
            engine.add_component(object, DiffuseMapComponent(grid));
        }
    }

    engine.spawn((
        SpatialComponent::new(Vec3::new(0.0, -0.5, 0.0), Vec3::new(2.0 * FIELD, 0.5, 2.0 * FIELD)),
        MeshComponent(cube),
        MaterialComponent::new(0.2, Vec3::splat(0.6), Vec3::splat(0.2), 4.0),
        Renderable::<GBufferShader>::new(),
    ));

    for _ in 0..LIGHTS {
        let color = Vec3::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
        let center = Vec3::new(rng.gen_range(-FIELD..FIELD), 1.5, rng.gen_range(-FIELD..FIELD));
        engine.spawn((
            // Scale is the light volume's radius.
            SpatialComponent::new(center, Vec3::splat(rng.gen_range(4.0..9.0))),
            LightComponent::new(color, Vec3::ZERO),
            Orbit {
                center,
                radius: rng.gen_range(1.0..6.0),
                speed: rng.gen_range(-1.5..1.5),
                angle: 0.0,
            },
            Renderable::<LightPassShader>::new(),
        ));
    }

    engine.add_system(CameraControllerSystem::new());
    engine.add_system(orbit_lights);

    let renderer = engine.renderer_mut();
    renderer.add_preprocess_shader(GBufferShader::new());
    renderer.add_preprocess_shader(LightPassShader::new());
    renderer.add_post_process_shader(
        PostProcessShader::new("CombineShader", "combine_deferred.frag")
            .with_uniform_names(&["lightOutput", "gDiffuse", "ambient"])
            .with_uniforms(|program, cmd, world| {
                let library = world.resource::<Library>();
                if let Some(light) = library.framebuffer(LIGHT_PASS_FBO).and_then(|fb| fb.color()) {
                    program.load_texture(cmd, "lightOutput", light);
                }
                if let Some(diffuse) = library.framebuffer(GBUFFER_FBO).and_then(|fb| fb.color_at(2)) {
                    program.load_texture(cmd, "gDiffuse", diffuse);
                }
                program.load_uniform(cmd, "ambient", 0.2_f32);
            }),
    );
    renderer.add_post_process_shader(GammaCorrectShader::default());

    engine.run()
}
